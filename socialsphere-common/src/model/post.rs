use crate::model::{Id, user::UserMarker};
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// A feed post. `username` and `user_id` are the denormalized owner
/// identity, set once at creation. `created_at` is assigned by the store.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub image_url: String,
    pub username: String,
    pub user_id: Id<UserMarker>,
    pub likes: Vec<Id<UserMarker>>,
    pub comments: Vec<Comment>,
    #[serde(with = "crate::util::ts_seconds_nanos")]
    pub created_at: UtcDateTime,
}

impl Post {
    /// Whether `likes` contains `user_id`.
    #[must_use]
    pub fn liked_by(&self, user_id: Id<UserMarker>) -> bool {
        self.likes.contains(&user_id)
    }

    #[must_use]
    pub fn comment(&self, comment_id: Id<CommentMarker>) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == comment_id)
    }
}

/// A top-level comment. `created_at` is the author's client clock, not a
/// store timestamp.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub text: String,
    pub username: String,
    #[serde(with = "crate::util::ts_millis")]
    pub created_at: UtcDateTime,
    pub replies: Vec<Reply>,
}

/// A reply to a comment. Same shape as [`Comment`] minus nested replies;
/// the feed only ever nests one level deep.
#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: Id<CommentMarker>,
    pub text: String,
    pub username: String,
    #[serde(with = "crate::util::ts_millis")]
    pub created_at: UtcDateTime,
}
