//! Side effects run when the remote service rejects the caller's credentials.

use crate::credentials::CredentialStore;
use std::fmt;
use std::sync::Arc;

/// Sends the user to the login entry point. Fire-and-forget.
pub trait Navigator: Send + Sync {
    /// Navigates to the login entry point.
    fn redirect_to_login(&self);
}

impl<F> Navigator for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

/// Invoked exactly once for every response classified as `Unauthenticated`.
pub trait UnauthenticatedHandler: Send + Sync {
    /// Handles a rejected credential.
    fn on_unauthenticated(&self);
}

/// Clears the credential store, then redirects to login.
pub struct ClearCredentialsAndRedirect {
    credentials: Arc<dyn CredentialStore>,
    navigator: Arc<dyn Navigator>,
}

impl ClearCredentialsAndRedirect {
    /// Creates a handler over the given collaborators.
    pub fn new(credentials: Arc<dyn CredentialStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            credentials,
            navigator,
        }
    }
}

impl UnauthenticatedHandler for ClearCredentialsAndRedirect {
    fn on_unauthenticated(&self) {
        self.credentials.clear_token();
        self.navigator.redirect_to_login();
    }
}

impl fmt::Debug for ClearCredentialsAndRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClearCredentialsAndRedirect")
            .finish_non_exhaustive()
    }
}

/// A closure-based handler.
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn() + Send + Sync,
{
    /// Wraps `f` as an [`UnauthenticatedHandler`].
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> UnauthenticatedHandler for FnHandler<F>
where
    F: Fn() + Send + Sync,
{
    fn on_unauthenticated(&self) {
        (self.f)()
    }
}
