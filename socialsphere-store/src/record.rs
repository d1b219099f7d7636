//! Raw record shapes of the store collections and their conversions into
//! domain values. Stored field names are camelCase; document metadata
//! (id, timestamps) is merged in during decoding.

use crate::document::Document;
use base64::{DecodeError, Engine, prelude::BASE64_STANDARD};
use serde::{Deserialize, Serialize};
use socialsphere_common::{
    model::{
        Id,
        auth::{Authentication, AuthTokenHash, InvalidAuthTokenHashError},
        post::{Comment, Post, PostMarker},
        save::{InvalidSaveKeyError, SaveKey},
        user::{UserMarker, UserProfile},
    },
    util::NonPositiveDurationError,
};
use std::num::ParseIntError;
use thiserror::Error;
use time::Duration;

#[derive(Debug, Error)]
pub enum DocumentDataError {
    #[error("Invalid document id: {0}")]
    Id(#[from] ParseIntError),
    #[error("Invalid document payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    SaveKey(#[from] InvalidSaveKeyError),
    #[error("Decoding base64 failed: {0}")]
    Base64(#[from] DecodeError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub image_url: String,
    pub username: String,
    pub user_id: Id<UserMarker>,
    #[serde(default)]
    pub likes: Vec<Id<UserMarker>>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl PostRecord {
    /// The record of a freshly created post.
    #[must_use]
    pub fn new(image_url: String, username: String, user_id: Id<UserMarker>) -> Self {
        Self {
            image_url,
            username,
            user_id,
            likes: Vec::new(),
            comments: Vec::new(),
        }
    }
}

impl TryFrom<&Document> for Post {
    type Error = DocumentDataError;

    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        let id: Id<PostMarker> = document.id.parse()?;
        let record: PostRecord = serde_json::from_value(document.data.clone())?;

        Ok(Self {
            id,
            image_url: record.image_url,
            username: record.username,
            user_id: record.user_id,
            likes: record.likes,
            comments: record.comments,
            created_at: document.created_at,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    pub uid: Id<UserMarker>,
    pub email: String,
    pub display_name: String,
    pub role: String,
}

impl From<&UserProfile> for ProfileRecord {
    fn from(profile: &UserProfile) -> Self {
        Self {
            uid: profile.uid,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role.clone(),
        }
    }
}

impl TryFrom<&Document> for UserProfile {
    type Error = DocumentDataError;

    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        let record: ProfileRecord = serde_json::from_value(document.data.clone())?;

        Ok(Self {
            uid: record.uid,
            email: record.email,
            display_name: record.display_name,
            role: record.role,
            created_at: document.created_at,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecord {
    pub user_id: Id<UserMarker>,
    pub post_id: Id<PostMarker>,
}

impl SaveRecord {
    pub fn decode(document: &Document) -> Result<(SaveKey, Self), DocumentDataError> {
        let key: SaveKey = document.id.parse()?;
        let record: Self = serde_json::from_value(document.data.clone())?;
        Ok((key, record))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: Id<UserMarker>,
    pub token_hash: String,
    /// Full-resolution TTL; whole seconds would truncate sub-second
    /// expiries to zero and fail the positivity check on read-back.
    pub expires_after_nanos: Option<i64>,
}

impl From<&Authentication> for SessionRecord {
    fn from(authentication: &Authentication) -> Self {
        Self {
            user_id: authentication.user,
            token_hash: authentication.token_hash.as_key(),
            // i64 nanoseconds covers TTLs of about 292 years.
            expires_after_nanos: authentication.expires_after.map(|expires_after| {
                i64::try_from(expires_after.get().whole_nanoseconds()).unwrap_or(i64::MAX)
            }),
        }
    }
}

impl TryFrom<&Document> for Authentication {
    type Error = DocumentDataError;

    fn try_from(document: &Document) -> Result<Self, Self::Error> {
        let record: SessionRecord = serde_json::from_value(document.data.clone())?;
        let token_hash: AuthTokenHash = BASE64_STANDARD.decode(&record.token_hash)?.try_into()?;

        Ok(Self {
            user: record.user_id,
            token_hash,
            created_at: document.created_at,
            expires_after: record
                .expires_after_nanos
                .map(|nanos| Duration::nanoseconds(nanos).try_into())
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        document::Document,
        record::{PostRecord, SaveRecord, SessionRecord},
    };
    use serde_json::json;
    use socialsphere_common::{
        model::{
            auth::{Authentication, AuthToken},
            post::Post,
            user::UserProfile,
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::utc_datetime};

    fn document(id: &str, data: serde_json::Value) -> Document {
        Document {
            id: id.to_owned(),
            revision: 1,
            created_at: utc_datetime!(2025-06-01 11:00),
            updated_at: utc_datetime!(2025-06-01 11:00),
            data,
        }
    }

    #[test]
    fn decode_post_document() {
        let document = document(
            "42",
            json!({
                "imageUrl": "https://x/1.png",
                "username": "alice",
                "userId": 7,
                "likes": [8],
                "comments": [{
                    "id": 100,
                    "text": "nice",
                    "username": "bob",
                    "createdAt": 1_748_779_200_000_i64,
                    "replies": [],
                }],
            }),
        );

        let post = Post::try_from(&document).unwrap();
        assert_eq!(post.id, 42_u64.into());
        assert_eq!(post.likes, vec![8_u64.into()]);
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.created_at, document.created_at);
    }

    #[test]
    fn decode_post_defaults_missing_collections() {
        let document = document(
            "42",
            json!({"imageUrl": "https://x/1.png", "username": "alice", "userId": 7}),
        );

        let post = Post::try_from(&document).unwrap();
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
    }

    #[test]
    fn decode_post_rejects_bad_id() {
        let document = document(
            "not-an-id",
            json!({"imageUrl": "https://x/1.png", "username": "alice", "userId": 7}),
        );
        assert!(Post::try_from(&document).is_err());
    }

    #[test]
    fn new_post_record_is_empty() {
        let record = PostRecord::new("https://x/1.png".to_owned(), "alice".to_owned(), 7_u64.into());
        assert!(record.likes.is_empty());
        assert!(record.comments.is_empty());
    }

    #[test]
    fn decode_profile_document() {
        let document = document(
            "7",
            json!({"uid": 7, "email": "alice@example.com", "displayName": "alice", "role": "user"}),
        );

        let profile = UserProfile::try_from(&document).unwrap();
        assert_eq!(profile.uid, 7_u64.into());
        assert_eq!(profile.display_name, "alice");
    }

    #[test]
    fn decode_save_document() {
        let document = document("7_12", json!({"userId": 7, "postId": 12}));

        let (key, record) = SaveRecord::decode(&document).unwrap();
        assert_eq!(key.user_id, 7_u64.into());
        assert_eq!(key.post_id, 12_u64.into());
        assert_eq!(record.post_id, 12_u64.into());
    }

    #[test]
    fn session_record_round_trip() {
        let authentication = Authentication {
            user: 7_u64.into(),
            token_hash: AuthToken::generate_random(7_u64.into()).hash().unwrap(),
            created_at: utc_datetime!(2025-06-01 11:00),
            expires_after: Some(PositiveDuration::new_unchecked(Duration::days(30))),
        };

        let record = SessionRecord::from(&authentication);
        let data = serde_json::to_value(&record).unwrap();
        let decoded = Authentication::try_from(&document(&record.token_hash, data)).unwrap();

        assert_eq!(decoded, authentication);
    }

    #[test]
    fn session_record_keeps_sub_second_ttl() {
        for ttl in [Duration::nanoseconds(1), Duration::milliseconds(250)] {
            let authentication = Authentication {
                user: 7_u64.into(),
                token_hash: AuthToken::generate_random(7_u64.into()).hash().unwrap(),
                created_at: utc_datetime!(2025-06-01 11:00),
                expires_after: Some(PositiveDuration::new_unchecked(ttl)),
            };

            let record = SessionRecord::from(&authentication);
            let data = serde_json::to_value(&record).unwrap();
            let decoded = Authentication::try_from(&document(&record.token_hash, data)).unwrap();

            assert_eq!(decoded.expires_after, authentication.expires_after);
        }
    }
}
