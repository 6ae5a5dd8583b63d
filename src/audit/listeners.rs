use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repository::AuditStoreState;

use super::{AuditEntry, AuditListener, ListenerError};

/// PersistAuditListener
///
/// Appends every entry to the audit store. Runs outside the transaction of
/// the mutation being audited.
pub struct PersistAuditListener {
    store: AuditStoreState,
}

impl PersistAuditListener {
    pub fn new(store: AuditStoreState) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuditListener for PersistAuditListener {
    fn name(&self) -> &'static str {
        "persist"
    }

    async fn handle(&self, entry: &AuditEntry) -> Result<(), ListenerError> {
        self.store.append(entry).await?;
        Ok(())
    }
}

/// WebhookAuditListener
///
/// Forwards every entry as JSON to a downstream notification endpoint.
/// Non-2xx responses count as failures.
pub struct WebhookAuditListener {
    client: reqwest::Client,
    url: String,
}

impl WebhookAuditListener {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AuditListener for WebhookAuditListener {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn handle(&self, entry: &AuditEntry) -> Result<(), ListenerError> {
        self.client
            .post(&self.url)
            .json(entry)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// TracingAuditListener
///
/// Writes each entry to the application log.
pub struct TracingAuditListener;

#[async_trait]
impl AuditListener for TracingAuditListener {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn handle(&self, entry: &AuditEntry) -> Result<(), ListenerError> {
        let actor = entry
            .actor_id()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "anonymous".to_string());
        tracing::info!(
            event = %entry.event(),
            actor = %actor,
            trace_id = entry.trace_id(),
            "audit"
        );
        tracing::debug!(event = %entry.event(), payload = %entry.payload(), "audit payload");
        Ok(())
    }
}

/// ChannelAuditListener
///
/// In-process sink that forwards entries to a channel. Used for local tooling
/// and tests.
pub struct ChannelAuditListener {
    tx: mpsc::UnboundedSender<Arc<AuditEntry>>,
}

impl ChannelAuditListener {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Arc<AuditEntry>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl AuditListener for ChannelAuditListener {
    fn name(&self) -> &'static str {
        "channel"
    }

    async fn handle(&self, entry: &AuditEntry) -> Result<(), ListenerError> {
        self.tx
            .send(Arc::new(entry.clone()))
            .map_err(|_| ListenerError::Rejected("channel receiver dropped".to_string()))
    }
}
