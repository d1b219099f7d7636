//! Post store adapter: the single point of translation between UI intents
//! and document-store operations.
//!
//! Mutations of collection fields (likes, comments) are read-modify-write
//! sequences guarded by the document revision: a concurrent writer makes
//! the write-back fail with a revision conflict and the sequence is
//! retried from a fresh read, bounded by [`MAX_WRITE_ATTEMPTS`]. The local
//! projection is only ever updated with the confirmed result of a write.

use crate::projection::FeedProjection;
use serde_json::json;
use socialsphere_common::model::{
    Id, SocialsphereSnowflakeGenerator,
    post::{Comment, CommentMarker, Post, PostMarker, Reply},
    save::{SaveKey, SavedPost},
    user::{UserIdentity, UserMarker},
};
use socialsphere_store::{
    document::{Document, Filter, StoreError, collections},
    record::{DocumentDataError, PostRecord, SaveRecord},
    store::DocumentStore,
};
use std::sync::Arc;
use thiserror::Error;
use time::UtcDateTime;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Attempts per read-modify-write sequence before giving up.
pub const MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Sign in to do that")]
    Unauthenticated,
    #[error("An image URL is required")]
    BlankImageUrl,
    #[error("Comment text must not be blank")]
    BlankCommentText,
    #[error("Post {0} was not found")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment {0} was not found")]
    CommentNotFound(Id<CommentMarker>),
    #[error("Only the owner of a post may edit it")]
    NotOwner,
    #[error("Gave up after {} conflicting writes", MAX_WRITE_ATTEMPTS)]
    Contended,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Stored document was invalid: {0}")]
    Data(#[from] DocumentDataError),
}

pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Outcome of [`FeedClient::toggle_save`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SaveToggle {
    Saved,
    Removed,
}

pub struct FeedClient {
    store: Arc<dyn DocumentStore>,
    comment_id_generator: Mutex<SocialsphereSnowflakeGenerator>,
    projection: RwLock<FeedProjection>,
}

impl FeedClient {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        comment_id_generator: SocialsphereSnowflakeGenerator,
    ) -> Self {
        Self {
            store,
            comment_id_generator: Mutex::new(comment_id_generator),
            projection: RwLock::new(FeedProjection::default()),
        }
    }

    /// A clone of the current local view state.
    pub async fn snapshot(&self) -> FeedProjection {
        self.projection.read().await.clone()
    }

    /// Creates a post owned by `identity` with empty likes and comments.
    pub async fn create_post(
        &self,
        image_url: &str,
        identity: Option<&UserIdentity>,
    ) -> Result<Id<PostMarker>> {
        let identity = identity.ok_or(FeedError::Unauthenticated)?;
        if image_url.trim().is_empty() {
            return Err(FeedError::BlankImageUrl);
        }

        let record = PostRecord::new(
            image_url.to_owned(),
            identity.display_name.clone(),
            identity.uid,
        );
        let document = self
            .store
            .add_document(collections::POSTS, encode(&record)?)
            .await?;

        let id = document.id.parse().map_err(DocumentDataError::Id)?;
        debug!(post = %id, owner = %identity.uid, "Created post");
        Ok(id)
    }

    /// Fetches a single post.
    pub async fn get_post(&self, post_id: Id<PostMarker>) -> Result<Post> {
        let document = self.fetch_post_document(post_id).await?;
        Ok(Post::try_from(&document)?)
    }

    /// Adds `user_id` to the post's likes when absent, removes it when
    /// present. Returns the confirmed likes list after mirroring it into
    /// the projection. Calling twice in sequence restores the original
    /// membership.
    pub async fn toggle_like(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Vec<Id<UserMarker>>> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let document = self.fetch_post_document(post_id).await?;
            let record: PostRecord = decode(&document)?;

            let mut likes = record.likes;
            if likes.contains(&user_id) {
                likes.retain(|liker| *liker != user_id);
            } else {
                likes.push(user_id);
            }

            match self
                .write_back(post_id, &document, json!({ "likes": likes }))
                .await?
            {
                WriteBack::Done => {
                    self.projection
                        .write()
                        .await
                        .set_likes(post_id, likes.clone());
                    return Ok(likes);
                }
                WriteBack::Conflicted => {}
            }
        }

        Err(FeedError::Contended)
    }

    /// Appends a comment with a client-generated id and client-clock
    /// timestamp, writing the full comment list back.
    pub async fn add_comment(
        &self,
        post_id: Id<PostMarker>,
        text: &str,
        author: &UserIdentity,
    ) -> Result<Comment> {
        if text.trim().is_empty() {
            return Err(FeedError::BlankCommentText);
        }

        let comment = Comment {
            id: self.comment_id_generator.lock().await.generate().into(),
            text: text.to_owned(),
            username: author.display_name.clone(),
            created_at: client_clock_now(),
            replies: Vec::new(),
        };

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let document = self.fetch_post_document(post_id).await?;
            let record: PostRecord = decode(&document)?;

            let mut comments = record.comments;
            comments.push(comment.clone());

            match self
                .write_back(post_id, &document, json!({ "comments": comments }))
                .await?
            {
                WriteBack::Done => {
                    self.projection
                        .write()
                        .await
                        .push_comment(post_id, comment.clone());
                    return Ok(comment);
                }
                WriteBack::Conflicted => {}
            }
        }

        Err(FeedError::Contended)
    }

    /// Appends a reply to the comment identified by `comment_id`. The
    /// comment is looked up in a fresh read each attempt; when it is
    /// absent the store is left untouched.
    pub async fn add_reply(
        &self,
        post_id: Id<PostMarker>,
        comment_id: Id<CommentMarker>,
        text: &str,
        author: &UserIdentity,
    ) -> Result<Reply> {
        if text.trim().is_empty() {
            return Err(FeedError::BlankCommentText);
        }

        let reply = Reply {
            id: self.comment_id_generator.lock().await.generate().into(),
            text: text.to_owned(),
            username: author.display_name.clone(),
            created_at: client_clock_now(),
        };

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let document = self.fetch_post_document(post_id).await?;
            let record: PostRecord = decode(&document)?;

            let mut comments = record.comments;
            let comment = comments
                .iter_mut()
                .find(|comment| comment.id == comment_id)
                .ok_or(FeedError::CommentNotFound(comment_id))?;
            comment.replies.push(reply.clone());

            match self
                .write_back(post_id, &document, json!({ "comments": comments }))
                .await?
            {
                WriteBack::Done => {
                    self.projection
                        .write()
                        .await
                        .push_reply(post_id, comment_id, reply.clone());
                    return Ok(reply);
                }
                WriteBack::Conflicted => {}
            }
        }

        Err(FeedError::Contended)
    }

    /// Deletes the post unconditionally; ownership is checked by the
    /// caller.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        self.store
            .delete_document(collections::POSTS, &post_id.to_string())
            .await
            .map_err(|error| {
                if error.is_not_found() {
                    FeedError::PostNotFound(post_id)
                } else {
                    error.into()
                }
            })?;

        self.projection.write().await.remove_post(post_id);
        Ok(())
    }

    /// Replaces the post's image URL. Fails when `caller` is not the
    /// owner; nothing is written in that case.
    pub async fn update_post(
        &self,
        post_id: Id<PostMarker>,
        new_image_url: &str,
        caller: Id<UserMarker>,
    ) -> Result<()> {
        if new_image_url.trim().is_empty() {
            return Err(FeedError::BlankImageUrl);
        }

        let document = self.fetch_post_document(post_id).await?;
        let record: PostRecord = decode(&document)?;
        if record.user_id != caller {
            return Err(FeedError::NotOwner);
        }

        self.store
            .update_document(
                collections::POSTS,
                &post_id.to_string(),
                json!({ "imageUrl": new_image_url }),
                None,
            )
            .await?;
        Ok(())
    }

    /// Toggles the save record keyed `{user}_{post}`: creates it when
    /// absent, removes it when present.
    pub async fn toggle_save(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<SaveToggle> {
        let key = SaveKey::new(user_id, post_id);
        let key_string = key.to_string();

        if self
            .store
            .get_document(collections::SAVES, &key_string)
            .await?
            .is_some()
        {
            match self
                .store
                .delete_document(collections::SAVES, &key_string)
                .await
            {
                // A concurrent toggle-off got there first; same outcome.
                Ok(()) => {}
                Err(error) if error.is_not_found() => {}
                Err(error) => return Err(error.into()),
            }
            self.projection.write().await.remove_saved(key);
            return Ok(SaveToggle::Removed);
        }

        let record = SaveRecord { user_id, post_id };
        self.store
            .set_document(collections::SAVES, &key_string, encode(&record)?)
            .await?;
        Ok(SaveToggle::Saved)
    }

    /// The full feed, unordered, replacing the projection's post list.
    pub async fn list_posts(&self) -> Result<Vec<Post>> {
        let documents = self
            .store
            .query_collection(collections::POSTS, Filter::All)
            .await?;
        let posts = decode_posts(&documents)?;

        self.projection.write().await.replace_posts(posts.clone());
        Ok(posts)
    }

    /// Posts owned by `user_id`.
    pub async fn list_owned_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<Post>> {
        let documents = self
            .store
            .query_collection(
                collections::POSTS,
                Filter::field_eq("userId", u64::from(user_id)),
            )
            .await?;
        decode_posts(&documents)
    }

    /// The user's saved posts, each dereferenced to a point-in-time post
    /// snapshot. A save whose post no longer exists is skipped.
    pub async fn list_saved_posts(&self, user_id: Id<UserMarker>) -> Result<Vec<SavedPost>> {
        let documents = self
            .store
            .query_collection(
                collections::SAVES,
                Filter::field_eq("userId", u64::from(user_id)),
            )
            .await?;

        let mut saved = Vec::with_capacity(documents.len());
        for document in &documents {
            let (key, record) = SaveRecord::decode(document)?;

            let Some(post_document) = self
                .store
                .get_document(collections::POSTS, &record.post_id.to_string())
                .await?
            else {
                warn!(post = %record.post_id, "Saved post no longer exists, skipping");
                continue;
            };

            saved.push(SavedPost {
                id: key,
                post_id: record.post_id,
                saved_at: document.updated_at,
                post_details: Post::try_from(&post_document)?,
            });
        }

        self.projection.write().await.replace_saved(saved.clone());
        Ok(saved)
    }

    async fn fetch_post_document(&self, post_id: Id<PostMarker>) -> Result<Document> {
        self.store
            .get_document(collections::POSTS, &post_id.to_string())
            .await?
            .ok_or(FeedError::PostNotFound(post_id))
    }

    /// Writes `fields` back against the revision the sequence read from.
    async fn write_back(
        &self,
        post_id: Id<PostMarker>,
        read: &Document,
        fields: serde_json::Value,
    ) -> Result<WriteBack> {
        let result = self
            .store
            .update_document(
                collections::POSTS,
                &read.id,
                fields,
                Some(read.revision),
            )
            .await;

        match result {
            Ok(_) => Ok(WriteBack::Done),
            Err(error) if error.is_revision_conflict() => {
                debug!(post = %post_id, "Concurrent write detected, retrying");
                Ok(WriteBack::Conflicted)
            }
            Err(error) if error.is_not_found() => Err(FeedError::PostNotFound(post_id)),
            Err(error) => Err(error.into()),
        }
    }
}

enum WriteBack {
    Done,
    Conflicted,
}

/// The stored representation of comment timestamps is whole milliseconds,
/// so the clock is truncated up front to keep returned and re-read values
/// identical.
fn client_clock_now() -> UtcDateTime {
    let millis = UtcDateTime::now().unix_timestamp_nanos().div_euclid(1_000_000);
    UtcDateTime::from_unix_timestamp_nanos(millis * 1_000_000)
        .unwrap_or(UtcDateTime::UNIX_EPOCH)
}

fn encode<T: serde::Serialize>(record: &T) -> Result<serde_json::Value> {
    serde_json::to_value(record).map_err(|error| StoreError::from(error).into())
}

fn decode(document: &Document) -> Result<PostRecord> {
    serde_json::from_value(document.data.clone())
        .map_err(|error| DocumentDataError::from(error).into())
}

fn decode_posts(documents: &[Document]) -> Result<Vec<Post>> {
    documents
        .iter()
        .map(|document| Post::try_from(document).map_err(FeedError::from))
        .collect()
}
