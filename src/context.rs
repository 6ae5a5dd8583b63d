use std::{convert::Infallible, fmt};

use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// PrincipalId
///
/// Opaque identifier of the authenticated actor (the `usuarios.id` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RequestContext
///
/// Per-request scope carrying the trace id and, once authentication has run,
/// the principal id. One value is created per request at the edge and passed
/// explicitly to the gate and the services. It is never shared between
/// requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    trace_id: String,
    principal: Option<PrincipalId>,
}

impl RequestContext {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            principal: None,
        }
    }

    /// A context with a freshly generated trace id. Used for background work
    /// and when a request reaches an extractor without passing the middleware.
    pub fn detached() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    pub fn with_principal(mut self, principal: PrincipalId) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }
}

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// context_middleware
///
/// Establishes the `RequestContext` for every request. Must sit inside the
/// `SetRequestIdLayer` so the `x-request-id` header is already present; its
/// value becomes the trace id.
pub async fn context_middleware(mut request: Request, next: Next) -> Response {
    let ctx = match request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(id) if !id.is_empty() => RequestContext::new(id),
        _ => RequestContext::detached(),
    };

    request.extensions_mut().insert(ctx);
    next.run(request).await
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<RequestContext>() {
            Some(ctx) => Ok(ctx.clone()),
            None => {
                tracing::debug!("request context missing, using a detached one");
                Ok(RequestContext::detached())
            }
        }
    }
}
