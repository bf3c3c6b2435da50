use std::sync::Arc;

use axum::{extract::FromRef, routing, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::{
        order::OrderCollection, product::ProductCollection, review::ReviewCollection,
        user::UserCollection,
    },
    config::{Config, StoreBackend},
    store::{Collection, DocumentStore, MemoryStore, MongoStore, UnavailableStore},
};

pub const LIVENESS_MESSAGE: &str = "Watch shop server is running...";

#[derive(FromRef, Clone)]
pub struct AppState {
    pub product_collection: ProductCollection,
    pub user_collection: UserCollection,
    pub order_collection: OrderCollection,
    pub review_collection: ReviewCollection,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            product_collection: ProductCollection(Collection::new(store.clone(), "products")),
            user_collection: UserCollection(Collection::new(store.clone(), "users")),
            order_collection: OrderCollection(Collection::new(store.clone(), "orders")),
            review_collection: ReviewCollection(Collection::new(store, "reviews")),
        }
    }

    /// Builds the state for the configured backend. A database client that
    /// cannot be set up is logged and replaced by a store that fails every
    /// call, so the server still starts and answers `GET /`.
    pub async fn from_config(config: &Config) -> Self {
        let store: Arc<dyn DocumentStore> = match (config.backend, &config.mongo_url) {
            (StoreBackend::Mongo, Some(mongo_url)) => {
                match MongoStore::connect(mongo_url, &config.database_name).await {
                    Ok(store) => {
                        store.spawn_ping();
                        Arc::new(store)
                    }
                    Err(err) => {
                        tracing::error!("cannot set up database client: {}", err);
                        Arc::new(UnavailableStore::new(err))
                    }
                }
            }
            (StoreBackend::Mongo, None) | (StoreBackend::Memory, _) => {
                tracing::warn!("using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        Self::new(store)
    }
}

pub async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

pub fn router(app_state: AppState) -> Router {
    use crate::api::{order, product, review, user};

    Router::new()
        .route("/", routing::get(liveness))
        .route("/products", routing::get(product::index).post(product::create))
        .route(
            "/products/:id",
            routing::get(product::show).delete(product::delete),
        )
        .route("/users", routing::post(user::create).put(user::upsert))
        .route(
            "/users/admin",
            routing::put(user::make_admin).get(user::check_admin_literal),
        )
        .route("/users/:email", routing::get(user::check_admin))
        .route("/orders", routing::get(order::index).post(order::create))
        .route(
            "/orders/:id",
            routing::get(order::index_by_email)
                .put(order::ship)
                .delete(order::delete),
        )
        .route("/reviews", routing::get(review::index).post(review::create))
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
