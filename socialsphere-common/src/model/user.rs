use crate::model::Id;
use serde::{Deserialize, Serialize};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

pub const DEFAULT_ROLE: &str = "user";

/// The `users` collection record for an account, written once at
/// registration.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: Id<UserMarker>,
    pub email: String,
    pub display_name: String,
    pub role: String,
    #[serde(with = "crate::util::ts_seconds_nanos")]
    pub created_at: UtcDateTime,
}

/// The session-scoped identity of the signed-in user. `None` of these
/// fields are authoritative for other users; ownership checks compare
/// `uid` only.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub uid: Id<UserMarker>,
    pub email: String,
    pub display_name: String,
}
