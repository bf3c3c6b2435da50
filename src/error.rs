use axum::{extract::rejection::PathRejection, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0} is not a valid identifier")]
    InvalidId(String),

    #[error("{0}")]
    DatabaseError(#[from] mongodb::error::Error),

    #[error("unsupported operator {0}")]
    UnsupportedOperator(String),

    #[error("duplicate key {0}")]
    DuplicateKey(String),

    #[error("field {0} is immutable")]
    ImmutableField(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorJson {
    r#type: String,
    message: String,
}

impl From<Error> for ErrorJson {
    fn from(err: Error) -> Self {
        Self {
            message: err.to_string(),
            r#type: err.to_string_variant(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        tracing::error!("error: {:?}", self);
        let status = match self {
            Self::InvalidId(..) => StatusCode::BAD_REQUEST,
            Self::DatabaseError(..)
            | Self::UnsupportedOperator(..)
            | Self::DuplicateKey(..)
            | Self::ImmutableField(..) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = ErrorJson::from(self);

        (status, Json(error)).into_response()
    }
}

impl Error {
    pub fn to_string_variant(&self) -> String {
        match self {
            Self::InvalidId(..) => "InvalidId",
            Self::DatabaseError(..) => "DatabaseError",
            Self::UnsupportedOperator(..) => "UnsupportedOperator",
            Self::DuplicateKey(..) => "DuplicateKey",
            Self::ImmutableField(..) => "ImmutableField",
        }
        .to_string()
    }
}

impl From<PathRejection> for Error {
    fn from(value: PathRejection) -> Self {
        Self::InvalidId(value.body_text())
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use super::Error;

    #[test]
    fn test_invalid_id_is_bad_request() {
        let response = Error::InvalidId("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_failures_are_internal() {
        for err in [
            Error::DuplicateKey("_id".to_string()),
            Error::ImmutableField("_id".to_string()),
        ] {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(
            Error::UnsupportedOperator("$inc".to_string()).to_string_variant(),
            "UnsupportedOperator"
        );
        assert_eq!(
            Error::DuplicateKey("_id".to_string()).to_string(),
            "duplicate key _id"
        );
    }
}
