use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    error::Error,
    store::{Collection, DeleteOutcome, InsertOutcome},
    util::{document_to_json, json_to_document, parse_limit, PathObjectId},
};

#[derive(Clone)]
pub struct ProductCollection(pub Collection);

impl std::ops::Deref for ProductCollection {
    type Target = Collection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexQuery {
    pub limit: Option<String>,
}

#[tracing::instrument(skip_all, fields(limit = ?query.limit))]
pub async fn index(
    State(products): State<ProductCollection>,
    Query(query): Query<IndexQuery>,
) -> Result<Json<Vec<Value>>, Error> {
    let limit = query.limit.as_deref().and_then(parse_limit);

    let products = products.find_limited(bson::doc! {}, limit).await?;

    Ok(Json(products.into_iter().map(document_to_json).collect()))
}

#[tracing::instrument(skip_all, fields(id = %product_id))]
pub async fn show(
    State(products): State<ProductCollection>,
    PathObjectId(product_id): PathObjectId,
) -> Result<Json<Option<Value>>, Error> {
    let product = products
        .find_one(bson::doc! {
            "_id": product_id,
        })
        .await?;

    Ok(Json(product.map(document_to_json)))
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(products): State<ProductCollection>,
    Json(request): Json<Map<String, Value>>,
) -> Result<Json<InsertOutcome>, Error> {
    let result = products.insert_one(json_to_document(request)).await?;

    tracing::debug!("created product {:?}", result);
    Ok(Json(result))
}

#[tracing::instrument(skip_all, fields(id = %product_id))]
pub async fn delete(
    State(products): State<ProductCollection>,
    PathObjectId(product_id): PathObjectId,
) -> Result<Json<DeleteOutcome>, Error> {
    let result = products
        .delete_one(bson::doc! {
            "_id": product_id,
        })
        .await?;

    tracing::debug!("deleted product {:?}", result);
    Ok(Json(result))
}
