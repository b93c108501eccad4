//! Authentication session.
//!
//! Identity lives in an external service reached through [`AuthProvider`].
//! [`AuthSession`] wraps one provider for one visitor: it publishes the
//! signed-in user on a watch channel and allows a single provider call in
//! flight at a time.

mod memory;
pub mod validation;

pub use memory::InMemoryAuthProvider;
pub use validation::{
    PasswordChecks, SignInForm, SignInRequest, SignUpForm, SignUpRequest, ValidationError,
};

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::events::{AuthEvent, DomainEvent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Google => f.write_str("Google"),
            Self::GitHub => f.write_str("GitHub"),
        }
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::GitHub),
            other => Err(AuthError::UnknownOAuthProvider(other.to_string())),
        }
    }
}

/// Errors reported by the identity provider or the session wrapping it.
/// The `Display` text is meant to be shown to the user as is.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("User already registered")]
    UserAlreadyExists,

    #[error("{0} sign-in is not available")]
    OAuthUnavailable(OAuthProvider),

    #[error("Unknown sign-in provider: {0}")]
    UnknownOAuthProvider(String),

    #[error("Another sign-in request is already in progress")]
    RequestInFlight,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("{0}")]
    Provider(String),
}

/// External identity service.
pub trait AuthProvider: Send + Sync {
    fn sign_up(&self, request: &SignUpRequest) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn sign_in(&self, request: &SignInRequest) -> impl Future<Output = Result<User, AuthError>> + Send;

    fn sign_out(&self, user: &User) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn sign_in_with_oauth(&self, provider: OAuthProvider) -> impl Future<Output = Result<User, AuthError>> + Send;
}

/// Clears the loading flag when dropped, whatever the outcome of the call.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self, AuthError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuthError::RequestInFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct AuthSession<P> {
    provider: Arc<P>,
    current: watch::Sender<Option<User>>,
    loading: AtomicBool,
    events: Mutex<Vec<DomainEvent>>,
}

impl<P: AuthProvider> AuthSession<P> {
    pub fn new(provider: Arc<P>) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current, loading: AtomicBool::new(false), events: Mutex::new(vec![]) }
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.borrow().clone()
    }

    /// Receiver that observes every sign-in and sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.current.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Creates the account. The visitor stays signed out until they sign in.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User, AuthError> {
        let _in_flight = InFlight::begin(&self.loading)?;
        let user = self.provider.sign_up(&request).await?;
        info!(user_id = %user.id, "Account created");
        self.raise_event(AuthEvent::SignedUp { user_id: user.id });
        Ok(user)
    }

    pub async fn sign_in(&self, request: SignInRequest) -> Result<User, AuthError> {
        let _in_flight = InFlight::begin(&self.loading)?;
        let user = self.provider.sign_in(&request).await.map_err(|e| {
            warn!(error = %e, "Sign-in failed");
            e
        })?;
        self.signed_in(&user);
        Ok(user)
    }

    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<User, AuthError> {
        let _in_flight = InFlight::begin(&self.loading)?;
        let user = self.provider.sign_in_with_oauth(provider).await?;
        self.signed_in(&user);
        Ok(user)
    }

    /// Always ends the local session; a provider failure is only logged.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let _in_flight = InFlight::begin(&self.loading)?;
        let Some(user) = self.current_user() else { return Ok(()) };
        if let Err(e) = self.provider.sign_out(&user).await {
            warn!(user_id = %user.id, error = %e, "Provider sign-out failed");
        }
        self.current.send_replace(None);
        info!(user_id = %user.id, "Signed out");
        self.raise_event(AuthEvent::SignedOut { user_id: user.id });
        Ok(())
    }

    pub fn take_events(&self) -> Vec<DomainEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn signed_in(&self, user: &User) {
        self.current.send_replace(Some(user.clone()));
        info!(user_id = %user.id, "Signed in");
        self.raise_event(AuthEvent::SignedIn { user_id: user.id });
    }

    fn raise_event(&self, e: AuthEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(DomainEvent::Auth(e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn sign_up_form(email: &str) -> SignUpForm {
        SignUpForm {
            full_name: "Grace Hopper".into(),
            email: email.into(),
            password: "Cobol1959x".into(),
            confirm_password: "Cobol1959x".into(),
        }
    }

    fn sign_in_form(email: &str, password: &str) -> SignInRequest {
        SignInForm { email: email.into(), password: password.into() }.validate().unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let session = AuthSession::new(Arc::new(InMemoryAuthProvider::new()));
        let created = session.sign_up(sign_up_form("grace@example.com").validate().unwrap()).await.unwrap();
        assert_eq!(created.full_name, "Grace Hopper");
        assert!(session.current_user().is_none());

        let mut updates = session.subscribe();
        let user = session.sign_in(sign_in_form("grace@example.com", "Cobol1959x")).await.unwrap();
        assert_eq!(user.id, created.id);
        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().as_ref().map(|u| u.id), Some(created.id));
        assert!(!session.is_loading());

        session.sign_out().await.unwrap();
        assert!(session.current_user().is_none());

        let names: Vec<_> = session.take_events().iter().map(DomainEvent::name).collect();
        assert_eq!(names, vec!["auth.signed_up", "auth.signed_in", "auth.signed_out"]);
    }

    #[tokio::test]
    async fn test_failed_sign_in_clears_loading() {
        let session = AuthSession::new(Arc::new(InMemoryAuthProvider::new()));
        let err = session.sign_in(sign_in_form("nobody@example.com", "Secret123")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(err.to_string(), "Invalid login credentials");
        assert!(!session.is_loading());
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_oauth_unavailable_in_memory() {
        let session = AuthSession::new(Arc::new(InMemoryAuthProvider::new()));
        let err = session.sign_in_with_oauth(OAuthProvider::Google).await.unwrap_err();
        assert_eq!(err.to_string(), "Google sign-in is not available");
    }

    #[tokio::test]
    async fn test_sign_out_without_user_is_noop() {
        let session = AuthSession::new(Arc::new(InMemoryAuthProvider::new()));
        session.sign_out().await.unwrap();
        assert!(session.take_events().is_empty());
    }

    /// Provider that parks every call until released.
    struct Gate {
        entered: Notify,
        release: Notify,
    }

    impl AuthProvider for Gate {
        async fn sign_up(&self, _request: &SignUpRequest) -> Result<User, AuthError> {
            Err(AuthError::Provider("unused".into()))
        }

        async fn sign_in(&self, request: &SignInRequest) -> Result<User, AuthError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(User { id: Uuid::nil(), email: request.email().to_string(), full_name: String::new(), created_at: Utc::now() })
        }

        async fn sign_out(&self, _user: &User) -> Result<(), AuthError> {
            Ok(())
        }

        async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<User, AuthError> {
            Err(AuthError::OAuthUnavailable(provider))
        }
    }

    #[tokio::test]
    async fn test_second_request_rejected_while_in_flight() {
        let gate = Arc::new(Gate { entered: Notify::new(), release: Notify::new() });
        let session = Arc::new(AuthSession::new(gate.clone()));

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.sign_in(sign_in_form("a@example.com", "x")).await }
        });
        gate.entered.notified().await;
        assert!(session.is_loading());

        let err = session.sign_in_with_oauth(OAuthProvider::GitHub).await.unwrap_err();
        assert!(matches!(err, AuthError::RequestInFlight));
        let err = session.sign_out().await.unwrap_err();
        assert!(matches!(err, AuthError::RequestInFlight));
        assert!(session.is_loading());

        gate.release.notify_one();
        let user = tokio::time::timeout(Duration::from_secs(5), pending).await.unwrap().unwrap().unwrap();
        assert_eq!(user.email, "a@example.com");
        assert!(!session.is_loading());
        assert_eq!(session.current_user(), Some(user));
    }

    #[test]
    fn test_oauth_provider_names() {
        assert_eq!("GitHub".parse::<OAuthProvider>().unwrap(), OAuthProvider::GitHub);
        assert!(matches!("myspace".parse::<OAuthProvider>(), Err(AuthError::UnknownOAuthProvider(_))));
    }
}
