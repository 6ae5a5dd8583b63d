use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{audit::AuditError, context::PrincipalId};

/// Resource
///
/// Entities that can be reported as missing to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Evento,
    EstadoEvento,
    CategoriaEvento,
}

/// AppError
///
/// Every failure a request can end with. Authorization failures are kept
/// distinct here so they can be logged precisely, but they render exactly like
/// a missing resource (see `IntoResponse` below).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no authenticated principal in request context")]
    Unauthenticated,

    #[error("principal {principal} lacks required permissions: {}", missing.join(", "))]
    Forbidden {
        principal: PrincipalId,
        missing: Vec<String>,
    },

    #[error("validation error in field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("{0:?} not found")]
    NotFound(Resource),

    #[error("persistence failure: {0}")]
    Upstream(#[from] sqlx::Error),

    #[error(transparent)]
    Audit(#[from] AuditError),
}

impl AppError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Body rendered to the caller.
    pub fn body(&self) -> ErrorBody {
        match self {
            // Collapsed on purpose: the caller must not learn whether the
            // resource exists or which permission is missing.
            AppError::Unauthenticated | AppError::Forbidden { .. } => ErrorBody::not_found(),
            AppError::NotFound(resource) => match resource {
                Resource::Evento => ErrorBody::new(
                    StatusCode::NOT_FOUND,
                    "evento.not_found",
                    "Evento no encontrado",
                    "Event not found",
                ),
                Resource::EstadoEvento => ErrorBody::new(
                    StatusCode::NOT_FOUND,
                    "evento.estado_not_found",
                    "Estado de evento no encontrado",
                    "Event state not found",
                ),
                Resource::CategoriaEvento => ErrorBody::new(
                    StatusCode::NOT_FOUND,
                    "evento.categoria_not_found",
                    "Categoría de evento no encontrada",
                    "Event category not found",
                ),
            },
            AppError::Validation { field, message } => ErrorBody {
                status: StatusCode::BAD_REQUEST.as_u16(),
                key: "general.validation_error".to_string(),
                message: format!("Error de validación en el campo '{field}': {message}"),
                message_eng: format!("Validation error in field '{field}': {message}"),
            },
            AppError::Upstream(_) | AppError::Audit(_) => ErrorBody::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "general.general_error",
                "Error interno del servidor",
                "Internal server error",
            ),
        }
    }
}

/// ErrorBody
///
/// The JSON error envelope shared by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub key: String,
    pub message: String,
    pub message_eng: String,
}

impl ErrorBody {
    fn new(status: StatusCode, key: &str, message: &str, message_eng: &str) -> Self {
        Self {
            status: status.as_u16(),
            key: key.to_string(),
            message: message.to_string(),
            message_eng: message_eng.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "general.not_found",
            "Recurso no encontrado",
            "Resource not found",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream(e) => tracing::error!(error = %e, "request failed upstream"),
            AppError::Audit(e) => tracing::error!(error = %e, "audit emission failed"),
            _ => {}
        }

        let body = self.body();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
