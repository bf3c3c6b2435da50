use axum::{extract::State, Json};
use serde_json::{Map, Value};

use crate::{
    error::Error,
    store::{Collection, InsertOutcome},
    util::{document_to_json, json_to_document},
};

#[derive(Clone)]
pub struct ReviewCollection(pub Collection);

impl std::ops::Deref for ReviewCollection {
    type Target = Collection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(reviews): State<ReviewCollection>,
    Json(request): Json<Map<String, Value>>,
) -> Result<Json<InsertOutcome>, Error> {
    let result = reviews.insert_one(json_to_document(request)).await?;

    tracing::debug!("created review {:?}", result);
    Ok(Json(result))
}

#[tracing::instrument(skip_all)]
pub async fn index(State(reviews): State<ReviewCollection>) -> Result<Json<Vec<Value>>, Error> {
    let reviews = reviews.find(bson::doc! {}).await?;

    Ok(Json(reviews.into_iter().map(document_to_json).collect()))
}
