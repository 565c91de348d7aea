//! HTTP error type.
//!
//! Every failure leaving a handler becomes an [`ApiError`]: a status, a
//! stable machine-readable code and a message safe to show a client.
//!
//! ```json
//! { "error": { "code": "INSUFFICIENT_STOCK", "message": "...", "fields": [...] } }
//! ```
//!
//! Store internals never reach the body. Unexpected failures are logged here
//! and answered with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::{CoreError, ValidationError, ValidationErrors};
use tally_db::DbError;
use tracing::{error, warn};

pub type ApiResult<T> = Result<T, ApiError>;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// An error response.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub fields: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// A malformed request that did not reach field validation.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }

    /// Logs `detail` and answers with a generic 500.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(error = %detail, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL",
            "An unexpected error occurred",
        )
    }

    pub fn with_field(mut self, field: impl Into<String>, message: impl Into<String>) -> Self {
        self.fields.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
        self
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let fields = errors
            .iter()
            .map(|e| FieldError {
                field: e.field().to_string(),
                message: e.to_string(),
            })
            .collect();

        ApiError {
            status: StatusCode::BAD_REQUEST,
            code: "VALIDATION_FAILED",
            message: "Request validation failed".to_string(),
            fields,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::from(ValidationErrors::from(err))
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::InsufficientStock { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_STOCK", message)
            }
            CoreError::InvalidCategory(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_CATEGORY", message)
            }
            CoreError::CategoryInUse { .. } => {
                Self::new(StatusCode::CONFLICT, "CATEGORY_IN_USE", message)
            }
            CoreError::UserHasHistory(_) => {
                Self::new(StatusCode::CONFLICT, "USER_HAS_HISTORY", message)
            }
            CoreError::Validation(errors) => ApiError::from(errors),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_transient() {
            warn!(error = %err, "Transient store failure");
            return Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "TRANSIENT_STORE_FAILURE",
                "The inventory store is busy, try again",
            );
        }

        match err {
            DbError::NotFound { entity, id } => {
                Self::not_found(format!("{entity} {id} not found"))
            }
            DbError::UniqueViolation { field, value } => {
                let (code, label) = match field.as_str() {
                    "sku" => ("DUPLICATE_SKU", "SKU"),
                    "name" => ("DUPLICATE_NAME", "Name"),
                    "email" => ("DUPLICATE_EMAIL", "Email"),
                    _ => return Self::internal(format!("unique violation on {field}")),
                };
                Self::new(
                    StatusCode::CONFLICT,
                    code,
                    format!("{label} '{value}' is already in use"),
                )
                .with_field(field, "already in use")
            }
            DbError::Domain(core) => ApiError::from(core),
            other => Self::internal(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "no_fields")]
    fields: &'a [FieldError],
}

fn no_fields(fields: &&[FieldError]) -> bool {
    fields.is_empty()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: &self.message,
                fields: &self.fields,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_is_a_client_error() {
        let err = ApiError::from(DbError::Domain(CoreError::InsufficientStock {
            product_id: 7,
            available: 10,
            requested: -15,
        }));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INSUFFICIENT_STOCK");
    }

    #[test]
    fn duplicate_codes_follow_the_column() {
        let sku = ApiError::from(DbError::duplicate("sku", "A-1"));
        let email = ApiError::from(DbError::duplicate("email", "a@b.co"));
        assert_eq!((sku.status, sku.code), (StatusCode::CONFLICT, "DUPLICATE_SKU"));
        assert_eq!(email.code, "DUPLICATE_EMAIL");
        assert_eq!(sku.fields[0].field, "sku");
    }

    #[test]
    fn transient_failures_are_503() {
        for err in [DbError::Busy, DbError::PoolExhausted] {
            let api = ApiError::from(err);
            assert_eq!(api.status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(api.code, "TRANSIENT_STORE_FAILURE");
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let api = ApiError::from(DbError::QueryFailed("no such table: secrets".to_string()));
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.message.contains("secrets"));
    }

    #[test]
    fn validation_lists_every_field() {
        let mut errors = ValidationErrors::new();
        errors.push(ValidationError::Required {
            field: "name".to_string(),
        });
        errors.push(ValidationError::MustBePositive {
            field: "priceCents".to_string(),
        });

        let api = ApiError::from(CoreError::Validation(errors));
        assert_eq!(api.code, "VALIDATION_FAILED");
        let fields: Vec<_> = api.fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "priceCents"]);
    }
}
