use serde_json::Value;
use thiserror::Error;
use time::UtcDateTime;

pub mod collections {
    pub const POSTS: &str = "posts";
    pub const USERS: &str = "users";
    pub const SAVES: &str = "saves";
    pub const SESSIONS: &str = "sessions";
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} was not found")]
    NotFound { collection: String, id: String },
    #[error(
        "Write to {collection}/{id} expected revision {expected} but found {actual}"
    )]
    RevisionConflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("Document could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("The store is unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    #[must_use]
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, Self::RevisionConflict { .. })
    }
}

/// A stored document plus the metadata the store maintains for it.
///
/// `revision` starts at 1 and increments on every write; writers pass it
/// back as the expected revision to detect lost updates. `created_at` is
/// assigned at first write and never changes; `updated_at` is refreshed on
/// every write.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Document {
    pub id: String,
    pub revision: u64,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
    pub data: Value,
}

impl Document {
    /// Top-level data field lookup.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

/// Query filter over a collection. Equality on a single top-level field is
/// the only shape the application queries with.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Filter {
    All,
    FieldEq { field: String, value: Value },
}

impl Filter {
    #[must_use]
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEq {
            field: field.into(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEq { field, value } => data.get(field) == Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Filter;
    use serde_json::json;

    #[test]
    fn filter_matching() {
        let data = json!({"userId": 7, "imageUrl": "https://x/1.png"});

        assert!(Filter::All.matches(&data));
        assert!(Filter::field_eq("userId", 7).matches(&data));
        assert!(!Filter::field_eq("userId", 8).matches(&data));
        assert!(!Filter::field_eq("missing", 7).matches(&data));
    }
}
