//! Core infrastructure for tower-dispatch.
//!
//! This crate provides functionality shared by every component of the
//! outbound request orchestration layer:
//! - Event system for observability
//! - The [`ClassifiedError`] taxonomy produced by the interceptor pipeline,
//!   consumed by the retry controller and surfaced to callers

pub mod error;
pub mod events;

pub use error::{BoxError, ClassifiedError, ErrorKind};
pub use events::{DispatchEvent, EventListener, EventListeners, FnListener};
