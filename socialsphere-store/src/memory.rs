use crate::{
    document::{Document, Filter, Result, StoreError},
    store::DocumentStore,
};
use async_trait::async_trait;
use serde_json::Value;
use socialsphere_common::{
    model::SocialsphereSnowflakeGenerator,
    snowflake::NodeId,
};
use std::collections::HashMap;
use time::UtcDateTime;
use tokio::sync::{Mutex, RwLock};

#[derive(Clone, Debug)]
struct Stored {
    revision: u64,
    created_at: UtcDateTime,
    updated_at: UtcDateTime,
    data: Value,
}

impl Stored {
    fn to_document(&self, id: &str) -> Document {
        Document {
            id: id.to_owned(),
            revision: self.revision,
            created_at: self.created_at,
            updated_at: self.updated_at,
            data: self.data.clone(),
        }
    }
}

/// In-memory [`DocumentStore`] with the same metadata semantics the remote
/// backend presents: store-assigned ids, server timestamps, per-document
/// revisions.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, Stored>>>,
    id_generator: Mutex<SocialsphereSnowflakeGenerator>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(node_id: NodeId) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            id_generator: Mutex::new(SocialsphereSnowflakeGenerator::new(node_id)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(NodeId::new_unchecked(0))
    }
}

/// Merges `fields` into `data` at the top level. Non-object payloads
/// replace the data wholesale.
fn merge_fields(data: &mut Value, fields: Value) {
    match (data.as_object_mut(), fields) {
        (Some(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (_, fields) => *data = fields,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        let document = collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|stored| stored.to_document(id));
        Ok(document)
    }

    async fn set_document(&self, collection: &str, id: &str, data: Value) -> Result<Document> {
        let now = UtcDateTime::now();
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_owned()).or_default();

        let stored = documents
            .entry(id.to_owned())
            .and_modify(|stored| {
                stored.revision += 1;
                stored.updated_at = now;
                stored.data = data.clone();
            })
            .or_insert_with(|| Stored {
                revision: 1,
                created_at: now,
                updated_at: now,
                data,
            });

        Ok(stored.to_document(id))
    }

    async fn add_document(&self, collection: &str, data: Value) -> Result<Document> {
        let id = self.id_generator.lock().await.generate().to_string();
        self.set_document(collection, &id, data).await
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        fields: Value,
        expected_revision: Option<u64>,
    ) -> Result<Document> {
        let now = UtcDateTime::now();
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;

        if let Some(expected) = expected_revision
            && expected != stored.revision
        {
            return Err(StoreError::RevisionConflict {
                collection: collection.to_owned(),
                id: id.to_owned(),
                expected,
                actual: stored.revision,
            });
        }

        merge_fields(&mut stored.data, fields);
        stored.revision += 1;
        stored.updated_at = now;

        Ok(stored.to_document(id))
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id));

        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(collection, id)),
        }
    }

    async fn query_collection(&self, collection: &str, filter: Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, stored)| filter.matches(&stored.data))
                    .map(|(id, stored)| stored.to_document(id))
                    .collect()
            })
            .unwrap_or_default();

        Ok(documents)
    }
}
