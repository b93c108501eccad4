use std::collections::HashMap;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, AuthProvider, OAuthProvider, SignInRequest, SignUpRequest, User};

struct Account {
    user: User,
    password_hash: String,
}

/// Process-local identity provider for development and tests.
///
/// Accounts vanish with the process and OAuth is never available.
#[derive(Default)]
pub struct InMemoryAuthProvider {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }
}

fn account_key(email: &str) -> String {
    email.to_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

impl AuthProvider for InMemoryAuthProvider {
    async fn sign_up(&self, request: &SignUpRequest) -> Result<User, AuthError> {
        let key = account_key(request.email());
        let password = request.password().to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(AuthError::UserAlreadyExists);
        }
        let user = User {
            id: Uuid::now_v7(),
            email: request.email().to_string(),
            full_name: request.full_name().to_string(),
            created_at: Utc::now(),
        };
        accounts.insert(key, Account { user: user.clone(), password_hash });
        debug!(user_id = %user.id, "Stored in-memory account");
        Ok(user)
    }

    async fn sign_in(&self, request: &SignInRequest) -> Result<User, AuthError> {
        let (user, password_hash) = {
            let accounts = self.accounts.read().await;
            let account = accounts.get(&account_key(request.email())).ok_or(AuthError::InvalidCredentials)?;
            (account.user.clone(), account.password_hash.clone())
        };
        let password = request.password().to_string();
        let verified = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if verified { Ok(user) } else { Err(AuthError::InvalidCredentials) }
    }

    async fn sign_out(&self, _user: &User) -> Result<(), AuthError> {
        Ok(())
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<User, AuthError> {
        Err(AuthError::OAuthUnavailable(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SignInForm, SignUpForm};

    fn sign_up(email: &str) -> SignUpRequest {
        SignUpForm {
            full_name: "Alan Turing".into(),
            email: email.into(),
            password: "Enigma1940".into(),
            confirm_password: "Enigma1940".into(),
        }
        .validate()
        .unwrap()
    }

    fn sign_in(email: &str, password: &str) -> SignInRequest {
        SignInForm { email: email.into(), password: password.into() }.validate().unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected_case_insensitively() {
        let provider = InMemoryAuthProvider::new();
        provider.sign_up(&sign_up("alan@example.com")).await.unwrap();
        let err = provider.sign_up(&sign_up("ALAN@example.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
        assert_eq!(provider.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_password_is_verified() {
        let provider = InMemoryAuthProvider::new();
        let created = provider.sign_up(&sign_up("alan@example.com")).await.unwrap();
        let user = provider.sign_in(&sign_in("Alan@Example.com", "Enigma1940")).await.unwrap();
        assert_eq!(user, created);
        let err = provider.sign_in(&sign_in("alan@example.com", "enigma1940")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_concurrent_sign_up_creates_one_account() {
        let provider = InMemoryAuthProvider::new();
        let (req_a, req_b) = (sign_up("alan@example.com"), sign_up("Alan@example.com"));
        let (first, second) = tokio::join!(provider.sign_up(&req_a), provider.sign_up(&req_b));
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        assert!(matches!(first.err().or(second.err()), Some(AuthError::UserAlreadyExists)));
        assert_eq!(provider.account_count().await, 1);
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("Enigma1940").unwrap();
        assert!(!hash.contains("Enigma1940"));
        assert!(verify_password("Enigma1940", &hash));
        assert!(!verify_password("Enigma1940", "not-a-phc-string"));
    }
}
