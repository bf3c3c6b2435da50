use std::sync::Arc;

use axum::async_trait;
use bson::{Bson, Document};
use serde::Serialize;

use crate::error::Error;

mod memory;
mod mongo;
mod unavailable;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use unavailable::UnavailableStore;

/// Result of an `insert_one`, shaped like the Node driver's so clients see
/// `{"acknowledged": true, "insertedId": "..."}`.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[serde(serialize_with = "crate::util::bson_as_json::serialize")]
    pub inserted_id: Bson,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    #[serde(serialize_with = "crate::util::option_bson_as_json::serialize")]
    pub upserted_id: Option<Bson>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Operations the handlers need from a document database.
///
/// Filters are plain documents of top-level field equalities and updates
/// are `$set` documents, so any backend that can express those can serve
/// the API.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, Error>;

    async fn find_one(&self, collection: &str, filter: Document)
        -> Result<Option<Document>, Error>;

    async fn insert_one(&self, collection: &str, document: Document)
        -> Result<InsertOutcome, Error>;

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, Error>;

    async fn delete_one(&self, collection: &str, filter: Document)
        -> Result<DeleteOutcome, Error>;
}

/// A named collection on a shared store.
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
}

impl Collection {
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self { store, name }
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Document>, Error> {
        self.store.find_many(self.name, filter, None).await
    }

    pub async fn find_limited(
        &self,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, Error> {
        self.store.find_many(self.name, filter, limit).await
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<Document>, Error> {
        self.store.find_one(self.name, filter).await
    }

    pub async fn insert_one(&self, document: Document) -> Result<InsertOutcome, Error> {
        self.store.insert_one(self.name, document).await
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, Error> {
        self.store.update_one(self.name, filter, update, false).await
    }

    pub async fn upsert_one(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, Error> {
        self.store.update_one(self.name, filter, update, true).await
    }

    pub async fn delete_one(&self, filter: Document) -> Result<DeleteOutcome, Error> {
        self.store.delete_one(self.name, filter).await
    }
}

#[cfg(test)]
mod tests {
    use bson::{oid::ObjectId, Bson};
    use serde_json::json;

    use super::{DeleteOutcome, InsertOutcome, UpdateOutcome};

    #[test]
    fn test_outcomes_use_driver_field_names() {
        let id = ObjectId::new();

        let insert = serde_json::to_value(InsertOutcome {
            acknowledged: true,
            inserted_id: Bson::ObjectId(id),
        })
        .unwrap();
        assert_eq!(insert, json!({ "acknowledged": true, "insertedId": id.to_hex() }));

        let update = serde_json::to_value(UpdateOutcome {
            acknowledged: true,
            matched_count: 1,
            modified_count: 0,
            upserted_count: 0,
            upserted_id: None,
        })
        .unwrap();
        assert_eq!(
            update,
            json!({
                "acknowledged": true,
                "matchedCount": 1,
                "modifiedCount": 0,
                "upsertedCount": 0,
                "upsertedId": null,
            })
        );

        let delete = serde_json::to_value(DeleteOutcome {
            acknowledged: true,
            deleted_count: 0,
        })
        .unwrap();
        assert_eq!(delete, json!({ "acknowledged": true, "deletedCount": 0 }));
    }
}
