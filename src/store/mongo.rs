use axum::async_trait;
use bson::Document;
use mongodb::options::{ClientOptions, FindOptions, UpdateOptions};

use crate::error::Error;

use super::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};

/// [`DocumentStore`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    database: mongodb::Database,
}

impl MongoStore {
    /// Sets up the client. Parsing an SRV url resolves its DNS records, so
    /// this fails when the cluster host cannot be looked up.
    pub async fn connect(
        mongo_url: &str,
        database_name: &str,
    ) -> Result<Self, mongodb::error::Error> {
        let mongo_client_opt = ClientOptions::parse(mongo_url).await?;
        let client = mongodb::Client::with_options(mongo_client_opt)?;
        let database = client.database(database_name);

        Ok(Self { database })
    }

    /// Checks connectivity in the background. A failure is only logged; the
    /// driver keeps trying to reach the cluster on every request.
    pub fn spawn_ping(&self) {
        let database = self.database.clone();

        tokio::spawn(async move {
            match database.run_command(bson::doc! { "ping": 1 }, None).await {
                Ok(_) => tracing::info!("connected to database {}", database.name()),
                Err(err) => tracing::error!("cannot reach database {}: {}", database.name(), err),
            }
        });
    }

    pub fn database(&self) -> &mongodb::Database {
        &self.database
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, Error> {
        let options = FindOptions::builder().limit(limit).build();
        let mut cursor = self.collection(collection).find(filter, options).await?;

        let mut documents = vec![];

        while cursor.advance().await? {
            documents.push(cursor.deserialize_current()?);
        }

        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, Error> {
        self.collection(collection)
            .find_one(filter, None)
            .await
            .map_err(Into::into)
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, Error> {
        let result = self.collection(collection).insert_one(document, None).await?;

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id: result.inserted_id,
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, Error> {
        let options = UpdateOptions::builder().upsert(upsert).build();
        let result = self
            .collection(collection)
            .update_one(filter, update, options)
            .await?;

        Ok(UpdateOutcome {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id,
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, Error> {
        let result = self.collection(collection).delete_one(filter, None).await?;

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};

    use crate::store::DocumentStore;

    use super::MongoStore;

    async fn connect() -> MongoStore {
        dotenvy::dotenv().ok();
        let mongodb_url = std::env::var("MONGODB_URI")
            .expect("Cannot retreive MONGODB_URI from environment variable.");

        let database_name = format!("watch_shop-test-{}", ObjectId::new());
        MongoStore::connect(&mongodb_url, &database_name)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "needs a running MongoDB at MONGODB_URI"]
    pub async fn test_mongo_round_trip() {
        let store = connect().await;

        let inserted = store
            .insert_one("reviews", doc! { "name": "Ana", "rating": 5 })
            .await
            .unwrap();

        let found = store
            .find_one("reviews", doc! { "_id": inserted.inserted_id.clone() })
            .await
            .unwrap()
            .expect("review should exist after insert");
        assert_eq!(found.get_str("name").unwrap(), "Ana");

        let upserted = store
            .update_one(
                "users",
                doc! { "email": "a@b.c" },
                doc! { "$set": { "email": "a@b.c", "name": "A" } },
                true,
            )
            .await
            .unwrap();
        assert_eq!(upserted.matched_count, 0);
        assert_eq!(upserted.upserted_count, 1);

        let deleted = store
            .delete_one("reviews", doc! { "_id": inserted.inserted_id })
            .await
            .unwrap();
        assert_eq!(deleted.deleted_count, 1);

        store.database().drop(None).await.unwrap();
    }
}
