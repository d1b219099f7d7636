use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use socialsphere_client::session::SessionGateway;
use socialsphere_common::model::{Id, auth::AuthToken, user::{UserIdentity, UserMarker}};
use std::sync::Arc;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// Extractor that rejects the request unless its bearer token resolves to
/// a live session.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    identity: UserIdentity,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.identity.uid
    }

    #[must_use]
    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<SessionGateway>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let identity = Arc::<SessionGateway>::from_ref(state)
            .authenticate(&token)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        Ok(Self { identity })
    }
}

/// Non-rejecting variant for the redirect-gated page routes: a missing,
/// malformed or revoked token extracts as `None` instead of failing the
/// request. Store failures still fail it.
#[derive(Clone, Debug)]
pub struct MaybeUser(pub Option<UserIdentity>);

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<SessionGateway>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Ok(header) = AuthorizationHeader::from_request_parts(parts, state).await else {
            return Ok(Self(None));
        };
        let Ok(token) = header.token().parse::<AuthToken>() else {
            return Ok(Self(None));
        };

        let identity = Arc::<SessionGateway>::from_ref(state)
            .authenticate(&token)
            .await?;
        Ok(Self(identity))
    }
}
