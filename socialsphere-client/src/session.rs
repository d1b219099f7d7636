//! Session gateway: the single owner of the signed-in identity. Every
//! identity transition is broadcast over a watch channel; dependents
//! subscribe explicitly instead of reading ambient global state.

use crate::provider::{AuthError, IdentityProvider};
use socialsphere_common::{
    model::{
        auth::{AuthToken, AuthTokenHashError, Authentication},
        user::{DEFAULT_ROLE, UserIdentity, UserProfile},
    },
    util::PositiveDuration,
};
use socialsphere_store::{
    document::{StoreError, collections},
    record::{DocumentDataError, ProfileRecord, SessionRecord},
    store::DocumentStore,
};
use std::sync::Arc;
use thiserror::Error;
use time::UtcDateTime;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("No user is signed in")]
    NotSignedIn,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("The auth token could not be hashed: {0}")]
    TokenHash(#[from] AuthTokenHashError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Stored record was invalid: {0}")]
    Data(#[from] DocumentDataError),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// A successful sign-in: the identity now broadcast to dependents and the
/// bearer token for subsequent requests.
#[derive(Clone, Debug)]
pub struct SignedIn {
    pub identity: UserIdentity,
    pub token: AuthToken,
}

pub struct SessionGateway {
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    identity: watch::Sender<Option<UserIdentity>>,
    session_ttl: Option<PositiveDuration>,
}

impl SessionGateway {
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            provider,
            store,
            identity: watch::Sender::new(None),
            session_ttl: None,
        }
    }

    /// Sessions opened by this gateway expire `session_ttl` after
    /// creation. Without it they never expire.
    #[must_use]
    pub fn with_session_ttl(mut self, session_ttl: PositiveDuration) -> Self {
        self.session_ttl = Some(session_ttl);
        self
    }

    /// The current identity, `None` when signed out.
    #[must_use]
    pub fn current(&self) -> Option<UserIdentity> {
        self.identity.borrow().clone()
    }

    /// Subscribes to identity transitions. The receiver sees the value at
    /// subscription time and every change after it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.identity.subscribe()
    }

    pub async fn sign_in_with_credentials(&self, email: &str, password: &str) -> Result<SignedIn> {
        require_field(email, "email")?;
        require_field(password, "password")?;

        let identity = self.provider.sign_in(email, password).await?;
        self.open_session(identity).await
    }

    pub async fn sign_in_with_provider(&self) -> Result<SignedIn> {
        let identity = self.provider.sign_in_federated().await?;

        // Federated accounts skip registration, so their profile document
        // may not exist yet.
        let uid_key = identity.uid.to_string();
        if self
            .store
            .get_document(collections::USERS, &uid_key)
            .await?
            .is_none()
        {
            let record = ProfileRecord {
                uid: identity.uid,
                email: identity.email.clone(),
                display_name: identity.display_name.clone(),
                role: DEFAULT_ROLE.to_owned(),
            };
            self.store
                .set_document(
                    collections::USERS,
                    &uid_key,
                    serde_json::to_value(&record).map_err(StoreError::from)?,
                )
                .await?;
        }

        self.open_session(identity).await
    }

    pub async fn register_account(
        &self,
        email: &str,
        name: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<SignedIn> {
        require_field(email, "email")?;
        require_field(name, "name")?;
        require_field(password, "password")?;
        require_field(confirm_password, "confirm password")?;
        if password != confirm_password {
            return Err(SessionError::PasswordMismatch);
        }

        let uid = self.provider.register(email, password).await?;

        let record = ProfileRecord {
            uid,
            email: email.to_owned(),
            display_name: name.to_owned(),
            role: DEFAULT_ROLE.to_owned(),
        };
        self.store
            .set_document(
                collections::USERS,
                &uid.to_string(),
                serde_json::to_value(&record).map_err(StoreError::from)?,
            )
            .await?;

        self.provider.update_display_name(uid, name).await?;

        let identity = UserIdentity {
            uid,
            email: email.to_owned(),
            display_name: name.to_owned(),
        };
        self.open_session(identity).await
    }

    /// Clears the identity and best-effort revokes the session record.
    /// Idempotent: signing out while signed out, or with an already
    /// revoked token, succeeds.
    pub async fn sign_out(&self, token: Option<&AuthToken>) -> Result<()> {
        self.identity.send_replace(None);

        if let Some(token) = token {
            let key = token.hash()?.as_key();
            match self.store.delete_document(collections::SESSIONS, &key).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {
                    debug!("Session record was already gone on sign-out");
                }
                Err(error) => return Err(error.into()),
            }
        }

        Ok(())
    }

    /// Updates the display name at the provider and in the profile
    /// document, then re-broadcasts the identity.
    pub async fn update_display_name(&self, name: &str) -> Result<UserIdentity> {
        require_field(name, "name")?;
        let mut identity = self.current().ok_or(SessionError::NotSignedIn)?;

        self.provider
            .update_display_name(identity.uid, name)
            .await?;
        self.store
            .update_document(
                collections::USERS,
                &identity.uid.to_string(),
                serde_json::json!({ "displayName": name }),
                None,
            )
            .await?;

        identity.display_name = name.to_owned();
        self.identity.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    /// Resolves a bearer token to an identity: session lookup by token
    /// hash, expiry check, profile fetch. `None` for unknown, expired or
    /// orphaned tokens.
    pub async fn authenticate(&self, token: &AuthToken) -> Result<Option<UserIdentity>> {
        let key = token.hash()?.as_key();
        let Some(session_document) = self.store.get_document(collections::SESSIONS, &key).await?
        else {
            return Ok(None);
        };

        let authentication = Authentication::try_from(&session_document)?;
        if authentication.expired_at(UtcDateTime::now()) {
            debug!(user = %authentication.user, "Rejecting expired session");
            return Ok(None);
        }

        let Some(profile_document) = self
            .store
            .get_document(collections::USERS, &authentication.user.to_string())
            .await?
        else {
            return Ok(None);
        };
        let profile = UserProfile::try_from(&profile_document)?;

        Ok(Some(UserIdentity {
            uid: profile.uid,
            email: profile.email,
            display_name: profile.display_name,
        }))
    }

    async fn open_session(&self, identity: UserIdentity) -> Result<SignedIn> {
        let token = AuthToken::generate_random(identity.uid);
        let token_hash = token.hash()?;

        let authentication = Authentication {
            user: identity.uid,
            token_hash,
            created_at: UtcDateTime::now(),
            expires_after: self.session_ttl,
        };
        let record = SessionRecord::from(&authentication);
        self.store
            .set_document(
                collections::SESSIONS,
                &record.token_hash,
                serde_json::to_value(&record).map_err(StoreError::from)?,
            )
            .await?;

        debug!(user = %identity.uid, "Opened session");
        self.identity.send_replace(Some(identity.clone()));

        Ok(SignedIn { identity, token })
    }
}

fn require_field(value: &str, name: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        Err(SessionError::MissingField(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        provider::MemoryIdentityProvider,
        session::{SessionError, SessionGateway},
    };
    use socialsphere_common::{model::user::UserIdentity, util::PositiveDuration};
    use socialsphere_store::memory::MemoryStore;
    use std::sync::Arc;
    use time::Duration;

    fn gateway() -> SessionGateway {
        SessionGateway::new(
            Arc::new(MemoryIdentityProvider::default()),
            Arc::new(MemoryStore::default()),
        )
    }

    #[tokio::test]
    async fn register_broadcasts_identity() {
        let gateway = gateway();
        let mut updates = gateway.subscribe();
        assert!(updates.borrow_and_update().is_none());

        let signed_in = gateway
            .register_account("alice@example.com", "alice", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();

        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().as_ref(),
            Some(&signed_in.identity)
        );
        assert_eq!(gateway.current(), Some(signed_in.identity));
    }

    #[tokio::test]
    async fn register_validates_fields() {
        let gateway = gateway();

        let error = gateway
            .register_account("", "alice", "pw", "pw")
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::MissingField("email")));

        let error = gateway
            .register_account("alice@example.com", "  ", "pw", "pw")
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::MissingField("name")));

        let error = gateway
            .register_account("alice@example.com", "alice", "pw", "other")
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::PasswordMismatch));

        assert!(gateway.current().is_none());
    }

    #[tokio::test]
    async fn sign_in_and_authenticate() {
        let gateway = gateway();
        gateway
            .register_account("alice@example.com", "alice", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();
        gateway.sign_out(None).await.unwrap();

        let signed_in = gateway
            .sign_in_with_credentials("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let identity = gateway
            .authenticate(&signed_in.token)
            .await
            .unwrap()
            .expect("token should resolve");
        assert_eq!(identity, signed_in.identity);
        assert_eq!(identity.display_name, "alice");
    }

    #[tokio::test]
    async fn sign_out_is_idempotent_and_revokes() {
        let gateway = gateway();
        let signed_in = gateway
            .register_account("alice@example.com", "alice", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();

        gateway.sign_out(Some(&signed_in.token)).await.unwrap();
        assert!(gateway.current().is_none());
        assert!(
            gateway
                .authenticate(&signed_in.token)
                .await
                .unwrap()
                .is_none()
        );

        // Again, with the same already-revoked token.
        gateway.sign_out(Some(&signed_in.token)).await.unwrap();
    }

    #[tokio::test]
    async fn expired_session_rejected() {
        let provider = Arc::new(MemoryIdentityProvider::default());
        let store = Arc::new(MemoryStore::default());
        let gateway = SessionGateway::new(provider, store)
            .with_session_ttl(PositiveDuration::new_unchecked(Duration::nanoseconds(1)));

        let signed_in = gateway
            .register_account("alice@example.com", "alice", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();

        assert!(
            gateway
                .authenticate(&signed_in.token)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn federated_sign_in_backfills_profile() {
        let federated = UserIdentity {
            uid: 99_u64.into(),
            email: "fed@example.com".to_owned(),
            display_name: "fed".to_owned(),
        };
        let provider =
            Arc::new(MemoryIdentityProvider::default().with_federated_identity(federated.clone()));
        let store = Arc::new(MemoryStore::default());
        let gateway = SessionGateway::new(provider, store);

        let signed_in = gateway.sign_in_with_provider().await.unwrap();
        assert_eq!(signed_in.identity, federated);

        let resolved = gateway
            .authenticate(&signed_in.token)
            .await
            .unwrap()
            .expect("token should resolve");
        assert_eq!(resolved, federated);
    }

    #[tokio::test]
    async fn update_display_name_requires_sign_in() {
        let gateway = gateway();
        let error = gateway.update_display_name("new name").await.unwrap_err();
        assert!(matches!(error, SessionError::NotSignedIn));

        gateway
            .register_account("alice@example.com", "alice", "hunter2hunter2", "hunter2hunter2")
            .await
            .unwrap();
        let identity = gateway.update_display_name("alice 2").await.unwrap();
        assert_eq!(identity.display_name, "alice 2");
        assert_eq!(gateway.current().unwrap().display_name, "alice 2");
    }
}
