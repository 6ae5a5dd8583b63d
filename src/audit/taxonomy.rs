use std::{collections::BTreeSet, fmt, sync::LazyLock};

use serde::{Deserialize, Serialize};

/// AuditAction
///
/// The fixed action vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub const ALL: [AuditAction; 3] = [AuditAction::Create, AuditAction::Update, AuditAction::Delete];

    pub const fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

/// AuditModel
///
/// Registered domain models. Adding a model means adding a variant here and
/// its name below; the taxonomy picks it up from `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditModel {
    User,
    Role,
    Permission,
    Bodega,
    Sucursal,
    Evento,
    MaximosDiasAdelanteReserva,
}

impl AuditModel {
    pub const ALL: [AuditModel; 7] = [
        AuditModel::User,
        AuditModel::Role,
        AuditModel::Permission,
        AuditModel::Bodega,
        AuditModel::Sucursal,
        AuditModel::Evento,
        AuditModel::MaximosDiasAdelanteReserva,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AuditModel::User => "user",
            AuditModel::Role => "role",
            AuditModel::Permission => "permission",
            AuditModel::Bodega => "bodega",
            AuditModel::Sucursal => "sucursal",
            AuditModel::Evento => "evento",
            AuditModel::MaximosDiasAdelanteReserva => "maximos-dias-adelante-reserva",
        }
    }

    pub fn event(self, action: AuditAction) -> AuditEventId {
        AuditEventId::new(self.as_str(), action)
    }
}

/// AuditEventId
///
/// An identifier of the form `<model>:<action>`. Constructing one does not
/// make it valid; the emitter only accepts members of its taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditEventId(String);

impl AuditEventId {
    pub fn new(model: &str, action: AuditAction) -> Self {
        Self(format!("{model}:{}", action.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuditEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

static STANDARD: LazyLock<AuditTaxonomy> = LazyLock::new(|| {
    let models: Vec<&str> = AuditModel::ALL.iter().map(|m| m.as_str()).collect();
    AuditTaxonomy::generate(&models, &AuditAction::ALL)
});

/// AuditTaxonomy
///
/// The closed set of valid event identifiers: the Cartesian product of the
/// registered models and the actions. Built once at startup and shared
/// read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTaxonomy {
    events: BTreeSet<AuditEventId>,
}

impl AuditTaxonomy {
    /// generate
    ///
    /// Pure and deterministic. Model names must be unique, otherwise the
    /// result is smaller than `models.len() * actions.len()`.
    pub fn generate(models: &[&str], actions: &[AuditAction]) -> Self {
        let events: BTreeSet<AuditEventId> = models
            .iter()
            .flat_map(|model| actions.iter().map(move |action| AuditEventId::new(model, *action)))
            .collect();

        debug_assert_eq!(
            events.len(),
            models.len() * actions.len(),
            "duplicate model or action registered in the audit taxonomy"
        );

        Self { events }
    }

    /// Taxonomy over every registered `AuditModel` and every `AuditAction`.
    /// Generated on first use and shared for the rest of the process.
    pub fn shared() -> &'static AuditTaxonomy {
        &STANDARD
    }

    /// An owned copy of `shared()`, for handing to an emitter.
    pub fn standard() -> Self {
        Self::shared().clone()
    }

    pub fn contains(&self, event: &AuditEventId) -> bool {
        self.events.contains(event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEventId> {
        self.events.iter()
    }
}
