use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::context::{PrincipalId, RequestContext};

use super::{AuditError, AuditEventId};

/// AuditEntry
///
/// One audit record, created once per committed mutation. Fields are private
/// so an entry cannot change after construction; listeners receive it behind
/// an `Arc`. Serializes to the listener wire shape
/// `{ tipoEvento, valor, actorId, traceId, timestamp }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    tipo_evento: AuditEventId,
    valor: serde_json::Value,
    actor_id: Option<PrincipalId>,
    trace_id: String,
    timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Snapshots `payload` and stamps it with the actor and trace id of `ctx`.
    pub fn new<T: Serialize>(
        event: AuditEventId,
        payload: &T,
        ctx: &RequestContext,
    ) -> Result<Self, AuditError> {
        let valor = serde_json::to_value(payload).map_err(AuditError::Snapshot)?;
        Ok(Self {
            tipo_evento: event,
            valor,
            actor_id: ctx.principal(),
            trace_id: ctx.trace_id().to_string(),
            timestamp: Utc::now(),
        })
    }

    pub fn event(&self) -> &AuditEventId {
        &self.tipo_evento
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.valor
    }

    pub fn actor_id(&self) -> Option<PrincipalId> {
        self.actor_id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Decodes the payload back into a typed snapshot.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.valor.clone())
    }
}
