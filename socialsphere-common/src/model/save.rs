use crate::model::{
    Id,
    post::{Post, PostMarker},
    user::UserMarker,
};
use serde::Serialize;
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::UtcDateTime;

/// Composite key of a save record: `{uid}_{postId}`. Key construction is
/// what guarantees at most one save record per (user, post) pair.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(into = "String")]
pub struct SaveKey {
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
}

impl SaveKey {
    #[must_use]
    pub fn new(user_id: Id<UserMarker>, post_id: Id<PostMarker>) -> Self {
        Self { user_id, post_id }
    }
}

impl Display for SaveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.user_id, self.post_id)
    }
}

impl From<SaveKey> for String {
    fn from(value: SaveKey) -> Self {
        value.to_string()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The save key is invalid: {0}")]
pub struct InvalidSaveKeyError(String);

impl FromStr for SaveKey {
    type Err = InvalidSaveKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user_part, post_part) = s
            .split_once('_')
            .ok_or_else(|| InvalidSaveKeyError(s.to_owned()))?;

        let user_id = user_part
            .parse()
            .map_err(|_| InvalidSaveKeyError(s.to_owned()))?;
        let post_id = post_part
            .parse()
            .map_err(|_| InvalidSaveKeyError(s.to_owned()))?;

        Ok(Self { user_id, post_id })
    }
}

/// A saved-posts entry: the save record plus a point-in-time snapshot of
/// the referenced post, fetched at list-render time.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPost {
    pub id: SaveKey,
    pub post_id: Id<PostMarker>,
    #[serde(with = "crate::util::ts_seconds_nanos")]
    pub saved_at: UtcDateTime,
    pub post_details: Post,
}
