use axum::async_trait;
use bson::Document;

use crate::error::Error;

use super::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};

/// Stands in for a database the server could not set up a client for.
/// Every call fails with the setup error, so data routes answer 500 while
/// the rest of the server keeps running.
#[derive(Clone, Debug)]
pub struct UnavailableStore {
    error: mongodb::error::Error,
}

impl UnavailableStore {
    pub fn new(error: mongodb::error::Error) -> Self {
        Self { error }
    }

    fn fail<T>(&self) -> Result<T, Error> {
        Err(Error::DatabaseError(self.error.clone()))
    }
}

#[async_trait]
impl DocumentStore for UnavailableStore {
    async fn find_many(
        &self,
        _collection: &str,
        _filter: Document,
        _limit: Option<i64>,
    ) -> Result<Vec<Document>, Error> {
        self.fail()
    }

    async fn find_one(
        &self,
        _collection: &str,
        _filter: Document,
    ) -> Result<Option<Document>, Error> {
        self.fail()
    }

    async fn insert_one(
        &self,
        _collection: &str,
        _document: Document,
    ) -> Result<InsertOutcome, Error> {
        self.fail()
    }

    async fn update_one(
        &self,
        _collection: &str,
        _filter: Document,
        _update: Document,
        _upsert: bool,
    ) -> Result<UpdateOutcome, Error> {
        self.fail()
    }

    async fn delete_one(
        &self,
        _collection: &str,
        _filter: Document,
    ) -> Result<DeleteOutcome, Error> {
        self.fail()
    }
}
