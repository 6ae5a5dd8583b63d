/// Router Module Index
///
/// Routes grouped by access level. Authentication is applied as a layer on
/// the authenticated and admin groups. Each protected route also carries a
/// `PermissionGuard` layer for the exact permission set it requires.

/// Unauthenticated, read-only routes.
pub mod public;

/// Routes requiring an authenticated principal plus a domain permission.
pub mod authenticated;

/// Routes restricted to `sudo`.
pub mod admin;
