use crate::server::{Result, ServerError, ServerRouter, auth::MaybeUser, json::Json};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::{
    TypedHeader,
    routing::{RouterExt, TypedPath},
};
use headers::{Authorization, authorization::Bearer};
use serde::{Deserialize, Serialize};
use socialsphere_client::session::{SessionGateway, SignedIn};
use socialsphere_common::model::{auth::AuthToken, user::UserIdentity};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(login_page)
        .typed_post(login)
        .typed_post(login_federated)
        .typed_get(register_page)
        .typed_post(register)
        .typed_post(logout)
}

/// The session handed back to the client after any successful sign-in.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: String,
    user: UserIdentity,
}

impl From<SignedIn> for SessionResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.token.as_token_str(),
            user: signed_in.identity,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login", rejection(ServerError))]
struct LoginPath();

/// Already-authenticated visitors are bounced back to the feed.
async fn login_page(LoginPath(): LoginPath, MaybeUser(user): MaybeUser) -> Response {
    match user {
        Some(_) => Redirect::to("/").into_response(),
        None => ().into_response(),
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    LoginPath(): LoginPath,
    State(gateway): State<Arc<SessionGateway>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let signed_in = gateway
        .sign_in_with_credentials(&request.email, &request.password)
        .await?;

    Ok(Json(signed_in.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/login/federated", rejection(ServerError))]
struct FederatedLoginPath();

async fn login_federated(
    FederatedLoginPath(): FederatedLoginPath,
    State(gateway): State<Arc<SessionGateway>>,
) -> Result<Json<SessionResponse>> {
    let signed_in = gateway.sign_in_with_provider().await?;

    Ok(Json(signed_in.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/register", rejection(ServerError))]
struct RegisterPath();

async fn register_page(RegisterPath(): RegisterPath, MaybeUser(user): MaybeUser) -> Response {
    match user {
        Some(_) => Redirect::to("/").into_response(),
        None => ().into_response(),
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: String,
    name: String,
    password: String,
    confirm_password: String,
}

async fn register(
    RegisterPath(): RegisterPath,
    State(gateway): State<Arc<SessionGateway>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<SessionResponse>> {
    let signed_in = gateway
        .register_account(
            &request.email,
            &request.name,
            &request.password,
            &request.confirm_password,
        )
        .await?;

    Ok(Json(signed_in.into()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/logout", rejection(ServerError))]
struct LogoutPath();

/// Idempotent: a missing or unparseable token still clears the session.
async fn logout(
    LogoutPath(): LogoutPath,
    State(gateway): State<Arc<SessionGateway>>,
    header: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<()> {
    let token = header.and_then(|header| header.token().parse::<AuthToken>().ok());

    gateway.sign_out(token.as_ref()).await?;
    Ok(())
}
