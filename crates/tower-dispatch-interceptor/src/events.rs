use std::time::Instant;
use tower_dispatch_core::{DispatchEvent, ErrorKind};

/// Events emitted by the interceptor pipeline.
#[derive(Debug, Clone)]
pub enum InterceptorEvent {
    /// A transport outcome was classified as a failure.
    ErrorClassified {
        component_name: String,
        timestamp: Instant,
        correlation_id: String,
        kind: ErrorKind,
        status: Option<u16>,
    },
    /// The remote service rejected the credentials; the handler has run.
    Unauthenticated {
        component_name: String,
        timestamp: Instant,
        correlation_id: String,
    },
}

impl DispatchEvent for InterceptorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InterceptorEvent::ErrorClassified { .. } => "error_classified",
            InterceptorEvent::Unauthenticated { .. } => "unauthenticated",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            InterceptorEvent::ErrorClassified { timestamp, .. }
            | InterceptorEvent::Unauthenticated { timestamp, .. } => *timestamp,
        }
    }

    fn component_name(&self) -> &str {
        match self {
            InterceptorEvent::ErrorClassified { component_name, .. }
            | InterceptorEvent::Unauthenticated { component_name, .. } => component_name,
        }
    }
}
