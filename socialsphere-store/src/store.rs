use crate::document::{Document, Filter, Result};
use async_trait::async_trait;
use serde_json::Value;

/// The document-store interface the application is written against. The
/// real backend is a managed remote service; [`crate::memory::MemoryStore`]
/// stands in for it in tests and local runs.
///
/// Semantics every implementation must uphold:
/// - Writes are whole-document or top-level-field replacements; there is no
///   transaction spanning documents.
/// - `update_document` with `Some(expected_revision)` must fail with
///   [`crate::document::StoreError::RevisionConflict`] rather than clobber
///   a concurrent write.
/// - `query_collection` returns documents in no particular order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one document, `None` when absent.
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Creates or fully overwrites the document at a caller-chosen key.
    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<Document>;

    /// Creates a document at a store-assigned key.
    async fn add_document(&self, collection: &str, data: Value) -> Result<Document>;

    /// Merges `fields` into the document's top level. Fails with `NotFound`
    /// when the document is absent and with `RevisionConflict` when
    /// `expected_revision` is stale.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
        expected_revision: Option<u64>,
    ) -> Result<Document>;

    /// Deletes the document; `NotFound` when it does not exist.
    async fn delete_document(&self, collection: &str, id: &str) -> Result<()>;

    /// All documents of the collection matching `filter`, unordered.
    async fn query_collection(&self, collection: &str, filter: Filter) -> Result<Vec<Document>>;
}
