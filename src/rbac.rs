use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    context::{PrincipalId, RequestContext},
    error::AppError,
    permissions::Permission,
};

/// Role
///
/// A named bundle of permission keys. Keys are kept as the raw strings read
/// from storage; a key that is not in the catalog simply never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub nombre: String,
    pub permisos: HashSet<String>,
}

/// ResolvedPrincipal
///
/// A principal together with the roles it holds, loaded for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrincipal {
    pub id: PrincipalId,
    pub roles: Vec<Role>,
}

impl ResolvedPrincipal {
    /// Union of the permission keys across every role.
    pub fn granted(&self) -> HashSet<&str> {
        self.roles
            .iter()
            .flat_map(|role| role.permisos.iter().map(String::as_str))
            .collect()
    }
}

/// RoleResolver
///
/// Loads a principal's roles and their permission keys. Called on every
/// protected request; implementations must not cache across requests.
/// `Ok(None)` means the principal does not exist (or is deleted).
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn resolve(&self, principal: PrincipalId) -> Result<Option<ResolvedPrincipal>, AppError>;
}

pub type RoleResolverState = Arc<dyn RoleResolver>;

/// Decision
///
/// The outcome of a permission check. `Deny` carries the exact keys that
/// were required but not granted; these are for server-side logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny {
        principal: PrincipalId,
        missing: BTreeSet<&'static str>,
    },
}

/// AuthorizationGate
///
/// Decides whether the principal in a `RequestContext` holds every permission
/// in a required set. Deny-by-default: only keys granted by one of the
/// principal's roles count, with no wildcard or inheritance.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: RoleResolverState,
}

impl AuthorizationGate {
    pub fn new(resolver: RoleResolverState) -> Self {
        Self { resolver }
    }

    /// check
    ///
    /// An empty `required` set always allows without touching storage.
    /// Resolver failures propagate as errors and are never turned into `Allow`.
    pub async fn check(
        &self,
        ctx: &RequestContext,
        required: &[Permission],
    ) -> Result<Decision, AppError> {
        if required.is_empty() {
            return Ok(Decision::Allow);
        }

        let principal = ctx.principal().ok_or(AppError::Unauthenticated)?;

        let Some(resolved) = self.resolver.resolve(principal).await? else {
            tracing::warn!(
                principal = %principal,
                trace_id = ctx.trace_id(),
                "principal not found while resolving roles"
            );
            return Ok(Decision::Deny {
                principal,
                missing: required.iter().map(|p| p.key()).collect(),
            });
        };

        let granted = resolved.granted();
        let missing: BTreeSet<&'static str> = required
            .iter()
            .map(|p| p.key())
            .filter(|key| !granted.contains(*key))
            .collect();

        if missing.is_empty() {
            Ok(Decision::Allow)
        } else {
            Ok(Decision::Deny { principal, missing })
        }
    }

    /// authorize
    ///
    /// Runs `check` and turns a denial into `AppError::Forbidden`, logging the
    /// missing keys. The caller only ever sees a generic not-found body.
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        required: &[Permission],
    ) -> Result<(), AppError> {
        match self.check(ctx, required).await {
            Ok(Decision::Allow) => Ok(()),
            Ok(Decision::Deny { principal, missing }) => {
                let missing: Vec<String> = missing.into_iter().map(str::to_string).collect();
                tracing::warn!(
                    principal = %principal,
                    trace_id = ctx.trace_id(),
                    missing = %missing.join(", "),
                    "principal lacks required permissions"
                );
                Err(AppError::Forbidden { principal, missing })
            }
            Err(AppError::Unauthenticated) => {
                tracing::error!(
                    trace_id = ctx.trace_id(),
                    "no principal in context; authentication must run before the permission guard"
                );
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                tracing::error!(trace_id = ctx.trace_id(), error = %e, "role resolution failed");
                Err(e)
            }
        }
    }
}

/// PermissionGuard
///
/// Middleware state pairing the gate with the permission set a route requires.
#[derive(Clone)]
pub struct PermissionGuard {
    gate: AuthorizationGate,
    required: &'static [Permission],
}

impl PermissionGuard {
    pub fn new(gate: AuthorizationGate, required: &'static [Permission]) -> Self {
        Self { gate, required }
    }
}

/// enforce_permissions
///
/// Route layer that short-circuits the request before the handler runs when
/// the gate does not allow it. Expects `context_middleware` and authentication
/// to have populated the `RequestContext` extension.
pub async fn enforce_permissions(
    State(guard): State<PermissionGuard>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .ok_or(AppError::Unauthenticated)?;

    guard.gate.authorize(&ctx, guard.required).await?;
    Ok(next.run(request).await)
}
