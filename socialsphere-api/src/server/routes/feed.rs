//! The page-shaped routes: feed, own posts, saved posts and the post
//! editor. Reads gate unauthenticated visitors with a redirect to
//! `/login`; writes reject with 401 like the action routes.

use crate::server::{
    Result, ServerError, ServerRouter,
    auth::{AuthenticatedUser, MaybeUser},
    json::Json,
};
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialsphere_client::feed::{FeedClient, FeedError};
use socialsphere_common::model::{
    Id,
    post::{Post, PostMarker},
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(feed)
        .typed_get(my_posts)
        .typed_get(saved_posts)
        .typed_post(add_post)
        .typed_get(edit_post_page)
        .typed_put(edit_post)
}

fn login_redirect() -> Response {
    Redirect::to("/login").into_response()
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct FeedPath();

async fn feed(
    FeedPath(): FeedPath,
    MaybeUser(user): MaybeUser,
    State(feed): State<Arc<FeedClient>>,
) -> Result<Response> {
    if user.is_none() {
        return Ok(login_redirect());
    }

    let posts = feed.list_posts().await?;
    Ok(Json(posts).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/my-posts", rejection(ServerError))]
struct MyPostsPath();

async fn my_posts(
    MyPostsPath(): MyPostsPath,
    MaybeUser(user): MaybeUser,
    State(feed): State<Arc<FeedClient>>,
) -> Result<Response> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };

    let posts = feed.list_owned_posts(user.uid).await?;
    Ok(Json(posts).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/saved-posts", rejection(ServerError))]
struct SavedPostsPath();

async fn saved_posts(
    SavedPostsPath(): SavedPostsPath,
    MaybeUser(user): MaybeUser,
    State(feed): State<Arc<FeedClient>>,
) -> Result<Response> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };

    let saved = feed.list_saved_posts(user.uid).await?;
    Ok(Json(saved).into_response())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/add-post", rejection(ServerError))]
struct AddPostPath();

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPostRequest {
    image_url: String,
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedPostResponse {
    id: Id<PostMarker>,
}

async fn add_post(
    AddPostPath(): AddPostPath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
    Json(request): Json<AddPostRequest>,
) -> Result<Json<CreatedPostResponse>> {
    let id = feed
        .create_post(&request.image_url, Some(user.identity()))
        .await?;

    Ok(Json(CreatedPostResponse { id }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/edit-post/{post_id}", rejection(ServerError))]
struct EditPostPath {
    post_id: Id<PostMarker>,
}

/// Prefill for the editor: the post itself, only for its owner.
async fn edit_post_page(
    EditPostPath { post_id }: EditPostPath,
    MaybeUser(user): MaybeUser,
    State(feed): State<Arc<FeedClient>>,
) -> Result<Response> {
    let Some(user) = user else {
        return Ok(login_redirect());
    };

    let post = feed.get_post(post_id).await?;
    if post.user_id != user.uid {
        return Err(FeedError::NotOwner.into());
    }

    Ok(Json(post).into_response())
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditPostRequest {
    image_url: String,
}

async fn edit_post(
    EditPostPath { post_id }: EditPostPath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
    Json(request): Json<EditPostRequest>,
) -> Result<Json<Post>> {
    feed.update_post(post_id, &request.image_url, user.user_id())
        .await?;

    Ok(Json(feed.get_post(post_id).await?))
}
