use axum::{
    extract::{Path, State},
    Json,
};
use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::Error,
    store::{Collection, InsertOutcome, UpdateOutcome},
    util::json_to_document,
};

pub const ADMIN_ROLE: &str = "admin";

/// Email looked up by `GET /users/admin`, whose static path shadows the
/// `:email` capture for that one segment.
pub const ADMIN_PATH_EMAIL: &str = "admin";

#[derive(Clone)]
pub struct UserCollection(pub Collection);

impl std::ops::Deref for UserCollection {
    type Target = Collection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The only part of a user document the server interprets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UserRole {
    #[default]
    Customer,
    Admin,
}

impl UserRole {
    pub fn of(user: &Document) -> Self {
        match user.get_str("role") {
            Ok(ADMIN_ROLE) => Self::Admin,
            _ => Self::Customer,
        }
    }
}

/// Filter selecting a user by the `email` a request body carries. A body
/// without one selects documents that have no email.
fn email_filter(email: Option<Bson>) -> Document {
    bson::doc! { "email": email.unwrap_or(Bson::Null) }
}

#[tracing::instrument(skip_all)]
pub async fn create(
    State(users): State<UserCollection>,
    Json(request): Json<Map<String, Value>>,
) -> Result<Json<InsertOutcome>, Error> {
    let result = users.insert_one(json_to_document(request)).await?;

    Ok(Json(result))
}

#[tracing::instrument(skip_all)]
pub async fn upsert(
    State(users): State<UserCollection>,
    Json(request): Json<Map<String, Value>>,
) -> Result<Json<UpdateOutcome>, Error> {
    let user = json_to_document(request);
    let filter = email_filter(user.get("email").cloned());

    tracing::debug!("saving user {}", filter);
    let result = users
        .upsert_one(
            filter,
            bson::doc! {
                "$set": user,
            },
        )
        .await?;

    Ok(Json(result))
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MakeAdminRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[tracing::instrument(skip_all, fields(email = ?request.email))]
pub async fn make_admin(
    State(users): State<UserCollection>,
    Json(request): Json<MakeAdminRequest>,
) -> Result<Json<UpdateOutcome>, Error> {
    let result = users
        .update_one(
            email_filter(request.email.map(Bson::String)),
            bson::doc! {
                "$set": { "role": ADMIN_ROLE },
            },
        )
        .await?;

    tracing::debug!("made admin {:?}", result);
    Ok(Json(result))
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminStatus {
    pub admin: bool,
}

#[tracing::instrument(skip_all, fields(email = %email))]
pub async fn check_admin(
    State(users): State<UserCollection>,
    Path(email): Path<String>,
) -> Result<Json<AdminStatus>, Error> {
    let user = users
        .find_one(bson::doc! {
            "email": &email,
        })
        .await?;
    tracing::debug!("found user {:?}", user);

    let role = user.as_ref().map(UserRole::of).unwrap_or_default();

    Ok(Json(AdminStatus {
        admin: role == UserRole::Admin,
    }))
}

/// `GET /users/admin` shares its path with the promotion route; it asks
/// about the user whose email is literally `admin`.
pub async fn check_admin_literal(
    users: State<UserCollection>,
) -> Result<Json<AdminStatus>, Error> {
    check_admin(users, Path(ADMIN_PATH_EMAIL.to_string())).await
}
