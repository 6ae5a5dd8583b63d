use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use serde::Serialize;

use crate::context::RequestContext;

use super::{AuditEntry, AuditError, AuditEventId, AuditTaxonomy, ListenerError};

/// AuditListener
///
/// An independent consumer of audit entries. Each listener runs on its own
/// worker task. A failing or panicking listener is logged and skipped and never
/// affects other listeners or the emitting request.
#[async_trait]
pub trait AuditListener: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, entry: &AuditEntry) -> Result<(), ListenerError>;
}

struct ListenerQueue {
    name: &'static str,
    tx: mpsc::UnboundedSender<Arc<AuditEntry>>,
}

struct EmitterInner {
    taxonomy: AuditTaxonomy,
    queues: Vec<ListenerQueue>,
}

/// AuditEmitter
///
/// Publish/subscribe bus for audit entries. Built once at startup with its
/// full listener set and then cloned into every service that publishes. The
/// listener registry is immutable after `build`.
#[derive(Clone)]
pub struct AuditEmitter {
    inner: Arc<EmitterInner>,
}

/// AuditEmitterBuilder
///
/// Collects listeners during startup wiring.
pub struct AuditEmitterBuilder {
    taxonomy: AuditTaxonomy,
    listeners: Vec<Arc<dyn AuditListener>>,
}

impl AuditEmitterBuilder {
    pub fn subscribe<L: AuditListener>(mut self, listener: L) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn subscribe_arc(mut self, listener: Arc<dyn AuditListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// build
    ///
    /// Spawns one worker task per listener.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn build(self) -> AuditEmitter {
        let queues = self
            .listeners
            .into_iter()
            .map(|listener| {
                let (tx, rx) = mpsc::unbounded_channel();
                let name = listener.name();
                tokio::spawn(run_listener(listener, rx));
                ListenerQueue { name, tx }
            })
            .collect();

        AuditEmitter {
            inner: Arc::new(EmitterInner {
                taxonomy: self.taxonomy,
                queues,
            }),
        }
    }
}

impl AuditEmitter {
    pub fn builder(taxonomy: AuditTaxonomy) -> AuditEmitterBuilder {
        AuditEmitterBuilder {
            taxonomy,
            listeners: Vec::new(),
        }
    }

    pub fn taxonomy(&self) -> &AuditTaxonomy {
        &self.inner.taxonomy
    }

    pub fn listener_count(&self) -> usize {
        self.inner.queues.len()
    }

    /// emit
    ///
    /// Hands `entry` to every listener without waiting for any of them.
    /// Call only after the mutation's transaction has committed.
    ///
    /// An identifier outside the taxonomy is a programming error: it is
    /// rejected before any listener sees the entry.
    pub fn emit(&self, entry: AuditEntry) -> Result<(), AuditError> {
        if !self.inner.taxonomy.contains(entry.event()) {
            tracing::error!(
                event = %entry.event(),
                trace_id = entry.trace_id(),
                "attempted to emit an audit event outside the taxonomy"
            );
            return Err(AuditError::UnknownEvent(entry.event().to_string()));
        }

        tracing::debug!(
            event = %entry.event(),
            trace_id = entry.trace_id(),
            listeners = self.inner.queues.len(),
            "emitting audit entry"
        );

        let entry = Arc::new(entry);
        for queue in &self.inner.queues {
            if queue.tx.send(Arc::clone(&entry)).is_err() {
                tracing::warn!(
                    listener = queue.name,
                    event = %entry.event(),
                    "audit listener worker is gone, entry dropped"
                );
            }
        }
        Ok(())
    }

    /// emit_committed
    ///
    /// Snapshots `payload` and emits it for a mutation that has already
    /// committed. A payload that cannot be snapshotted is logged and skipped
    /// and the caller still gets `Ok`. An identifier outside the taxonomy
    /// fails as in `emit`.
    pub fn emit_committed<T: Serialize>(
        &self,
        ctx: &RequestContext,
        event: AuditEventId,
        payload: &T,
    ) -> Result<(), AuditError> {
        if !self.inner.taxonomy.contains(&event) {
            tracing::error!(
                event = %event,
                trace_id = ctx.trace_id(),
                "attempted to emit an audit event outside the taxonomy"
            );
            return Err(AuditError::UnknownEvent(event.to_string()));
        }

        match AuditEntry::new(event.clone(), payload, ctx) {
            Ok(entry) => self.emit(entry),
            Err(e) => {
                tracing::error!(
                    event = %event,
                    trace_id = ctx.trace_id(),
                    error = %e,
                    "committed mutation left without an audit entry"
                );
                Ok(())
            }
        }
    }
}

/// Drains one listener's queue in order. Each entry is handled on its own
/// task so a panic is caught by the join handle instead of killing the worker.
async fn run_listener(
    listener: Arc<dyn AuditListener>,
    mut rx: mpsc::UnboundedReceiver<Arc<AuditEntry>>,
) {
    let name = listener.name();
    while let Some(entry) = rx.recv().await {
        let task_listener = Arc::clone(&listener);
        let task_entry = Arc::clone(&entry);
        let outcome =
            tokio::spawn(async move { task_listener.handle(&task_entry).await }).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                listener = name,
                event = %entry.event(),
                trace_id = entry.trace_id(),
                error = %e,
                "audit listener failed"
            ),
            Err(join_error) => tracing::error!(
                listener = name,
                event = %entry.event(),
                trace_id = entry.trace_id(),
                error = %join_error,
                "audit listener panicked"
            ),
        }
    }
    tracing::debug!(listener = name, "audit listener worker stopped");
}
