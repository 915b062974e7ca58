//! Bearer credential storage consulted on every outbound request.

use std::sync::{Arc, Mutex, PoisonError};

/// A key/value store holding the current bearer token.
///
/// The interceptor reads it before each request and clears it when the
/// remote service answers `401 Unauthorized`.
pub trait CredentialStore: Send + Sync {
    /// Returns the current token, if any.
    fn token(&self) -> Option<String>;

    /// Replaces the current token.
    fn set_token(&self, token: String);

    /// Forgets the current token.
    fn clear_token(&self);
}

impl<T: CredentialStore + ?Sized> CredentialStore for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }

    fn set_token(&self, token: String) {
        (**self).set_token(token)
    }

    fn clear_token(&self) {
        (**self).clear_token()
    }
}

/// A process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: String) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn clear_token(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
