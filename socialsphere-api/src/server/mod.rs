use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use serde::{Deserialize, Serialize};
use socialsphere_client::{
    feed::{FeedClient, FeedError},
    provider::AuthError,
    session::{SessionError, SessionGateway},
};
use socialsphere_common::model::auth::{AuthTokenDecodeError, AuthTokenHashError};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, FromRef)]
pub struct ServerState {
    pub gateway: Arc<SessionGateway>,
    pub feed: Arc<FeedClient>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::Feed(FeedError::PostNotFound(_) | FeedError::CommentNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken
            | ServerError::Feed(FeedError::Unauthenticated)
            | ServerError::Session(
                SessionError::NotSignedIn
                | SessionError::Auth(AuthError::InvalidCredentials | AuthError::FederatedCancelled),
            ) => StatusCode::UNAUTHORIZED,
            ServerError::Feed(FeedError::NotOwner) => StatusCode::FORBIDDEN,
            ServerError::Feed(FeedError::Contended)
            | ServerError::Session(SessionError::Auth(AuthError::EmailTaken)) => {
                StatusCode::CONFLICT
            }
            ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::Feed(FeedError::BlankImageUrl | FeedError::BlankCommentText)
            | ServerError::Session(
                SessionError::MissingField(_) | SessionError::PasswordMismatch,
            ) => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::AuthTokenHash(_)
            | ServerError::Feed(FeedError::Store(_) | FeedError::Data(_))
            | ServerError::Session(
                SessionError::Auth(AuthError::UnknownUser(_) | AuthError::Unavailable(_))
                | SessionError::TokenHash(_)
                | SessionError::Store(_)
                | SessionError::Data(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
