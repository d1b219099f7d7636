//! The identity-provider interface the session gateway consumes, plus an
//! in-memory implementation used by tests and local runs.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use socialsphere_common::{
    model::{
        Id, SocialsphereSnowflakeGenerator,
        user::{UserIdentity, UserMarker},
    },
    snowflake::NodeId,
};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Federated sign-in was cancelled")]
    FederatedCancelled,
    #[error("No account exists for user {0}")]
    UnknownUser(Id<UserMarker>),
    #[error("The identity provider is unavailable: {0}")]
    Unavailable(String),
}

/// External identity provider: credential and federated sign-in, account
/// creation, profile display-name updates. Session and profile-document
/// bookkeeping stays with the gateway.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError>;

    /// Federated (popup) sign-in; fails with
    /// [`AuthError::FederatedCancelled`] when the user backs out.
    async fn sign_in_federated(&self) -> Result<UserIdentity, AuthError>;

    /// Creates an account and returns its uid. The display name is empty
    /// until [`IdentityProvider::update_display_name`] is called.
    async fn register(&self, email: &str, password: &str) -> Result<Id<UserMarker>, AuthError>;

    async fn update_display_name(
        &self,
        uid: Id<UserMarker>,
        display_name: &str,
    ) -> Result<(), AuthError>;
}

#[derive(Clone, Debug)]
struct Account {
    uid: Id<UserMarker>,
    email: String,
    display_name: String,
    password_hash: String,
}

impl Account {
    fn identity(&self) -> UserIdentity {
        UserIdentity {
            uid: self.uid,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// In-memory [`IdentityProvider`]. Passwords are stored as argon2 PHC
/// strings; uids are snowflakes. A federated identity can be configured,
/// otherwise federated sign-in behaves like a dismissed popup.
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    uid_generator: Mutex<SocialsphereSnowflakeGenerator>,
    federated_identity: Option<UserIdentity>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            uid_generator: Mutex::new(SocialsphereSnowflakeGenerator::new(node_id)),
            federated_identity: None,
        }
    }

    /// Configures the identity federated sign-in resolves with.
    #[must_use]
    pub fn with_federated_identity(mut self, identity: UserIdentity) -> Self {
        self.federated_identity = Some(identity);
        self
    }

    fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|error| AuthError::Unavailable(error.to_string()))
    }

    fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|error| AuthError::Unavailable(error.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new(NodeId::new_unchecked(0))
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<UserIdentity, AuthError> {
        let accounts = self.accounts.read().await;
        let account = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;

        Self::verify_password(password, &account.password_hash)?;
        Ok(account.identity())
    }

    async fn sign_in_federated(&self) -> Result<UserIdentity, AuthError> {
        self.federated_identity
            .clone()
            .ok_or(AuthError::FederatedCancelled)
    }

    async fn register(&self, email: &str, password: &str) -> Result<Id<UserMarker>, AuthError> {
        let password_hash = Self::hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }

        let uid: Id<UserMarker> = self.uid_generator.lock().await.generate().into();
        accounts.insert(
            email.to_owned(),
            Account {
                uid,
                email: email.to_owned(),
                display_name: String::new(),
                password_hash,
            },
        );

        Ok(uid)
    }

    async fn update_display_name(
        &self,
        uid: Id<UserMarker>,
        display_name: &str,
    ) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .values_mut()
            .find(|account| account.uid == uid)
            .ok_or(AuthError::UnknownUser(uid))?;

        account.display_name = display_name.to_owned();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::provider::{AuthError, IdentityProvider, MemoryIdentityProvider};
    use socialsphere_common::model::user::UserIdentity;

    #[tokio::test]
    async fn register_then_sign_in() {
        let provider = MemoryIdentityProvider::default();

        let uid = provider
            .register("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();
        provider.update_display_name(uid, "alice").await.unwrap();

        let identity = provider
            .sign_in("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(identity.uid, uid);
        assert_eq!(identity.display_name, "alice");
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let provider = MemoryIdentityProvider::default();
        provider
            .register("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let error = provider
            .sign_in("alice@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::InvalidCredentials));

        let error = provider
            .sign_in("nobody@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let provider = MemoryIdentityProvider::default();
        provider
            .register("alice@example.com", "first")
            .await
            .unwrap();

        let error = provider
            .register("alice@example.com", "second")
            .await
            .unwrap_err();
        assert!(matches!(error, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn federated_sign_in() {
        let provider = MemoryIdentityProvider::default();
        let error = provider.sign_in_federated().await.unwrap_err();
        assert!(matches!(error, AuthError::FederatedCancelled));

        let identity = UserIdentity {
            uid: 7_u64.into(),
            email: "alice@example.com".to_owned(),
            display_name: "alice".to_owned(),
        };
        let provider = MemoryIdentityProvider::default().with_federated_identity(identity.clone());
        assert_eq!(provider.sign_in_federated().await.unwrap(), identity);
    }
}
