//! Action routes on a single post: like, comment, reply, save, delete.

use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::{Deserialize, Serialize};
use socialsphere_client::feed::{FeedClient, FeedError, SaveToggle};
use socialsphere_common::model::{
    Id,
    post::{Comment, CommentMarker, PostMarker, Reply},
    user::UserMarker,
};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(toggle_like)
        .typed_post(add_comment)
        .typed_post(add_reply)
        .typed_delete(delete_post)
        .typed_post(toggle_save)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<PostMarker>,
}

async fn toggle_like(
    LikePath { id }: LikePath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Id<UserMarker>>>> {
    let likes = feed.toggle_like(id, user.user_id()).await?;

    Ok(Json(likes))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    text: String,
}

async fn add_comment(
    CommentsPath { id }: CommentsPath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
    Json(request): Json<CommentRequest>,
) -> Result<Json<Comment>> {
    let comment = feed.add_comment(id, &request.text, user.identity()).await?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments/{comment_id}/replies", rejection(ServerError))]
struct RepliesPath {
    id: Id<PostMarker>,
    comment_id: Id<CommentMarker>,
}

async fn add_reply(
    RepliesPath { id, comment_id }: RepliesPath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
    Json(request): Json<CommentRequest>,
) -> Result<Json<Reply>> {
    let reply = feed
        .add_reply(id, comment_id, &request.text, user.identity())
        .await?;

    Ok(Json(reply))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
) -> Result<()> {
    let post = feed.get_post(id).await?;
    if post.user_id != user.user_id() {
        return Err(FeedError::NotOwner.into());
    }

    feed.delete_post(id).await?;
    Ok(())
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/save", rejection(ServerError))]
struct SavePath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveToggleResponse {
    saved: bool,
}

async fn toggle_save(
    SavePath { id }: SavePath,
    State(feed): State<Arc<FeedClient>>,
    user: AuthenticatedUser,
) -> Result<Json<SaveToggleResponse>> {
    let toggle = feed.toggle_save(id, user.user_id()).await?;

    Ok(Json(SaveToggleResponse {
        saved: toggle == SaveToggle::Saved,
    }))
}
