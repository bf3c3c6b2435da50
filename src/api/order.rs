use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{Map, Value};

use crate::{
    error::Error,
    store::{Collection, DeleteOutcome, InsertOutcome, UpdateOutcome},
    util::{document_to_json, json_to_document, PathObjectId},
};

/// Status an order moves to once it leaves the shop. Orders never move
/// anywhere else.
pub const SHIPPED_STATUS: &str = "shipped";

#[derive(Clone)]
pub struct OrderCollection(pub Collection);

impl std::ops::Deref for OrderCollection {
    type Target = Collection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(orders): State<OrderCollection>,
    Json(request): Json<Map<String, Value>>,
) -> Result<Json<InsertOutcome>, Error> {
    let result = orders.insert_one(json_to_document(request)).await?;

    Ok(Json(result))
}

#[tracing::instrument(skip_all)]
pub async fn index(State(orders): State<OrderCollection>) -> Result<Json<Vec<Value>>, Error> {
    let orders = orders.find(bson::doc! {}).await?;

    Ok(Json(orders.into_iter().map(document_to_json).collect()))
}

#[tracing::instrument(skip_all, fields(email = %email))]
pub async fn index_by_email(
    State(orders): State<OrderCollection>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Value>>, Error> {
    let orders = orders
        .find(bson::doc! {
            "email": &email,
        })
        .await?;

    Ok(Json(orders.into_iter().map(document_to_json).collect()))
}

#[tracing::instrument(skip_all, fields(id = %order_id))]
pub async fn ship(
    State(orders): State<OrderCollection>,
    PathObjectId(order_id): PathObjectId,
) -> Result<Json<UpdateOutcome>, Error> {
    let result = orders
        .update_one(
            bson::doc! {
                "_id": order_id,
            },
            bson::doc! {
                "$set": { "status": SHIPPED_STATUS },
            },
        )
        .await?;

    tracing::debug!("shipped order {:?}", result);
    Ok(Json(result))
}

#[tracing::instrument(skip_all, fields(id = %order_id))]
pub async fn delete(
    State(orders): State<OrderCollection>,
    PathObjectId(order_id): PathObjectId,
) -> Result<Json<DeleteOutcome>, Error> {
    let result = orders
        .delete_one(bson::doc! {
            "_id": order_id,
        })
        .await?;

    tracing::debug!("deleted order {:?}", result);
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::{extract::Path, Json};
    use bson::{oid::ObjectId, Bson};
    use serde_json::json;

    use crate::{
        api::tests::{body, bootstrap, Bootstrap},
        util::PathObjectId,
    };

    async fn place(bootstrap: &Bootstrap, email: &str, status: &str) -> ObjectId {
        let Json(outcome) = super::create(
            bootstrap.order_collection(),
            body(json!({
                "email": email,
                "status": status,
                "items": [{ "product": "Speedmaster", "quantity": 1 }],
            })),
        )
        .await
        .unwrap();

        match outcome.inserted_id {
            Bson::ObjectId(id) => id,
            other => panic!("order should get an object id, got {other}"),
        }
    }

    #[tokio::test]
    pub async fn test_orders_by_email() {
        let bootstrap = bootstrap();
        place(&bootstrap, "ana@shop.io", "pending").await;
        place(&bootstrap, "ana@shop.io", "pending").await;
        place(&bootstrap, "ben@shop.io", "pending").await;

        let Json(all) = super::index(bootstrap.order_collection()).await.unwrap();
        assert_eq!(all.len(), 3);

        let Json(ana) =
            super::index_by_email(bootstrap.order_collection(), Path("ana@shop.io".to_string()))
                .await
                .unwrap();
        assert_eq!(ana.len(), 2);
        assert!(ana.iter().all(|order| order["email"] == json!("ana@shop.io")));

        let Json(nobody) =
            super::index_by_email(bootstrap.order_collection(), Path("cy@shop.io".to_string()))
                .await
                .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    pub async fn test_ship_sets_literal_status() {
        let bootstrap = bootstrap();

        for prior in ["pending", "cancelled", "shipped"] {
            let id = place(&bootstrap, "ana@shop.io", prior).await;

            let Json(outcome) = super::ship(bootstrap.order_collection(), PathObjectId(id))
                .await
                .unwrap();
            assert_eq!(outcome.matched_count, 1);
            assert_eq!(outcome.modified_count, u64::from(prior != "shipped"));

            let order = bootstrap
                .order_collection()
                .0
                .find_one(bson::doc! { "_id": id })
                .await
                .unwrap()
                .unwrap();
            assert_eq!(order.get_str("status").unwrap(), super::SHIPPED_STATUS);
        }
    }

    #[tokio::test]
    pub async fn test_delete_twice_is_not_a_failure() {
        let bootstrap = bootstrap();
        let id = place(&bootstrap, "ana@shop.io", "pending").await;

        let Json(first) = super::delete(bootstrap.order_collection(), PathObjectId(id))
            .await
            .unwrap();
        let Json(second) = super::delete(bootstrap.order_collection(), PathObjectId(id))
            .await
            .unwrap();

        assert_eq!(first.deleted_count, 1);
        assert_eq!(second.deleted_count, 0);
        assert!(second.acknowledged);
    }
}
