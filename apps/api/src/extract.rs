//! Extractors that answer malformed input with the JSON error body.
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies and a
//! mix of 400/415/422. These wrappers turn every rejection into a 400
//! `VALIDATION_FAILED`, naming the field when serde reports one.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body. Unknown fields are rejected by the target type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

/// Query string.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, Clone, Copy)]
pub struct ValidPath<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidQuery(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ValidPath(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    let detail = rejection.body_text();
    with_serde_field(ApiError::bad_request("Request body is not valid"), &detail)
}

fn query_rejection(rejection: QueryRejection) -> ApiError {
    let detail = rejection.body_text();
    with_serde_field(ApiError::bad_request("Query string is not valid"), &detail)
}

fn path_rejection(rejection: PathRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

/// Adds the field serde complained about, if the message names one.
///
/// serde quotes the field in backticks: "unknown field `quantity`, expected
/// one of ..." or "missing field `name`".
fn with_serde_field(err: ApiError, detail: &str) -> ApiError {
    for marker in ["unknown field `", "missing field `"] {
        if let Some(start) = detail.find(marker) {
            let rest = &detail[start + marker.len()..];
            if let Some(end) = rest.find('`') {
                let message = detail[start..].split(" at line").next().unwrap_or(detail);
                return err.with_field(&rest[..end], message);
            }
        }
    }

    // invalid types and malformed syntax keep serde's own wording
    let message = match detail.split_once(": ") {
        Some((prefix, rest)) if prefix.starts_with("Failed to") => rest,
        _ => detail,
    };
    ApiError {
        message: format!("{}: {}", err.message, message),
        ..err
    }
}
