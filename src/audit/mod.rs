//! Audit trail: the event taxonomy, the entry type, the emitter and its
//! listeners.

use thiserror::Error;

pub mod emitter;
pub mod entry;
pub mod listeners;
pub mod taxonomy;

pub use emitter::{AuditEmitter, AuditEmitterBuilder, AuditListener};
pub use entry::AuditEntry;
pub use listeners::{ChannelAuditListener, PersistAuditListener, TracingAuditListener, WebhookAuditListener};
pub use taxonomy::{AuditAction, AuditEventId, AuditModel, AuditTaxonomy};

/// Errors raised on the emitting side. These reach the service that emitted.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit event '{0}' is not part of the audit taxonomy")]
    UnknownEvent(String),

    #[error("failed to snapshot audit payload: {0}")]
    Snapshot(#[source] serde_json::Error),
}

/// Errors raised inside a listener. Logged by the emitter worker and never
/// propagated.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("audit store rejected entry: {0}")]
    Store(#[from] sqlx::Error),

    #[error("audit delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),

    #[error("{0}")]
    Rejected(String),
}
