use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    context::PrincipalId,
};

/// Claims
///
/// Payload expected inside the bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the principal id (`usuarios.id`).
    pub sub: i64,
    /// Expiration time. Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The authenticated identity of a request. Carries only the principal id;
/// roles are loaded by the authorization gate on each protected request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: PrincipalId,
}

pub const DEV_USER_HEADER: &str = "x-user-id";

/// AuthUser Extractor Implementation
///
/// 1. In `Env::Local`, an integer `x-user-id` header is accepted as-is
///    (development bypass). Production ignores the header.
/// 2. Otherwise a `Bearer` HS256 token with a valid `exp` is required.
///
/// Rejection: `401 Unauthorized` on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| raw.trim().parse::<i64>().ok());
            if let Some(id) = bypass {
                return Ok(AuthUser {
                    id: PrincipalId(id),
                });
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!(reason = ?other, "rejected invalid token"),
            }
            StatusCode::UNAUTHORIZED
        })?;

        Ok(AuthUser {
            id: PrincipalId(token_data.claims.sub),
        })
    }
}
