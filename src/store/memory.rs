use std::collections::HashMap;

use axum::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use tokio::sync::RwLock;

use crate::error::Error;

use super::{DeleteOutcome, DocumentStore, InsertOutcome, UpdateOutcome};

/// In-process [`DocumentStore`] for running without a database.
///
/// Understands top-level equality filters and `$set` updates, with the
/// same matching rules the server applies to them: numbers compare across
/// types, `null` matches a missing field and a scalar matches an array that
/// contains it.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(number) => Some(f64::from(*number)),
        Bson::Int64(number) => Some(*number as f64),
        Bson::Double(number) => Some(*number),
        _ => None,
    }
}

fn values_equal(stored: &Bson, expected: &Bson) -> bool {
    match (as_f64(stored), as_f64(expected)) {
        (Some(left), Some(right)) => left == right,
        _ => stored == expected,
    }
}

fn field_matches(stored: Option<&Bson>, expected: &Bson) -> bool {
    match stored {
        None => matches!(expected, Bson::Null),
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(stored) => values_equal(stored, expected),
    }
}

fn check_filter(filter: &Document) -> Result<(), Error> {
    match filter.keys().find(|key| key.starts_with('$')) {
        Some(operator) => Err(Error::UnsupportedOperator(operator.clone())),
        None => Ok(()),
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(key, expected)| field_matches(document.get(key), expected))
}

fn merge(target: &mut Document, source: Document) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

/// Pulls the `$set` fields out of an update document.
fn set_fields(update: &Document) -> Result<Document, Error> {
    let mut fields = Document::new();

    for (operator, value) in update {
        match (operator.as_str(), value) {
            ("$set", Bson::Document(set)) => merge(&mut fields, set.clone()),
            _ => return Err(Error::UnsupportedOperator(operator.clone())),
        }
    }

    Ok(fields)
}

/// Applies `fields` to `document`, returning whether anything changed.
fn apply_set(document: &mut Document, fields: &Document) -> Result<bool, Error> {
    let mut modified = false;

    for (key, value) in fields {
        if key == "_id" {
            if document.get(key) != Some(value) {
                return Err(Error::ImmutableField(key.clone()));
            }
            continue;
        }

        if document.get(key) != Some(value) {
            document.insert(key.clone(), value.clone());
            modified = true;
        }
    }

    Ok(modified)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_many(
        &self,
        collection: &str,
        filter: Document,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, Error> {
        check_filter(&filter)?;

        let collections = self.collections.read().await;
        let found = collections
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|document| matches_filter(document, &filter));

        let documents = match limit {
            Some(limit) if limit != 0 => found
                .take(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX))
                .cloned()
                .collect(),
            _ => found.cloned().collect(),
        };

        Ok(documents)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Option<Document>, Error> {
        check_filter(&filter)?;

        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|documents| {
                documents
                    .iter()
                    .find(|document| matches_filter(document, &filter))
            })
            .cloned())
    }

    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOutcome, Error> {
        let document = if document.contains_key("_id") {
            document
        } else {
            let mut with_id = bson::doc! { "_id": ObjectId::new() };
            merge(&mut with_id, document);
            with_id
        };

        let inserted_id = document.get("_id").cloned().unwrap_or(Bson::Null);

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents
            .iter()
            .any(|existing| existing.get("_id") == Some(&inserted_id))
        {
            return Err(Error::DuplicateKey(format!("_id: {inserted_id}")));
        }

        documents.push(document);

        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id,
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome, Error> {
        check_filter(&filter)?;
        let fields = set_fields(&update)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if let Some(document) = documents
            .iter_mut()
            .find(|document| matches_filter(document, &filter))
        {
            let modified = apply_set(document, &fields)?;

            return Ok(UpdateOutcome {
                acknowledged: true,
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_count: 0,
                upserted_id: None,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome {
                acknowledged: true,
                matched_count: 0,
                modified_count: 0,
                upserted_count: 0,
                upserted_id: None,
            });
        }

        let id = fields
            .get("_id")
            .or_else(|| filter.get("_id"))
            .cloned()
            .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

        let mut document = bson::doc! { "_id": id.clone() };
        merge(&mut document, filter);
        merge(&mut document, fields);

        documents.push(document);

        Ok(UpdateOutcome {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<DeleteOutcome, Error> {
        check_filter(&filter)?;

        let mut collections = self.collections.write().await;

        let position = collections.get(collection).and_then(|documents| {
            documents
                .iter()
                .position(|document| matches_filter(document, &filter))
        });

        let deleted_count = match (position, collections.get_mut(collection)) {
            (Some(position), Some(documents)) => {
                documents.remove(position);
                1
            }
            _ => 0,
        };

        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count,
        })
    }
}
