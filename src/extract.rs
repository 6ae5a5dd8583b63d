use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// ValidQuery
///
/// `Query<T>` whose rejection renders as a `general.validation_error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// ValidPath
///
/// `Path<T>` whose rejection renders as a `general.validation_error`.
#[derive(Debug, Clone, Copy)]
pub struct ValidPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// ValidJson
///
/// `Json<T>` body whose rejection renders as a `general.validation_error`.
/// Consumes the body, so it must be the last handler argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        split_rejection(&rejection.body_text(), "query")
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        split_rejection(&rejection.body_text(), "id")
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::validation("body", "expected `Content-Type: application/json`")
            }
            other => split_rejection(&other.body_text(), "body"),
        }
    }
}

/// Rejection texts read `<summary>: [<field>: ]<reason>`. The summary is
/// dropped; a leading whitespace-free segment names the offending field.
fn split_rejection(text: &str, default_field: &str) -> AppError {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);

    match detail.split_once(": ") {
        Some((field, reason)) if !field.is_empty() && !field.contains(char::is_whitespace) => {
            AppError::validation(field, reason)
        }
        _ => AppError::validation(default_field, detail),
    }
}
