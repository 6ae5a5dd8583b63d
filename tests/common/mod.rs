#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use eventhub::{
    AppConfig, AppState, AuditEmitter, AuditTaxonomy, AuthorizationGate, EventoService,
    ReservaService,
    audit::{AuditEntry, ChannelAuditListener},
    context::PrincipalId,
    error::{AppError, Resource},
    models::{
        CategoriaEvento, CreateEventoRequest, Evento, EventoDetalle, EventoFilter,
        MaximosDiasReserva, UpdateEventoRequest,
    },
    pagination::ListParams,
    rbac::{ResolvedPrincipal, Role, RoleResolver},
    repository::{EventoRepository, ReservaRepository},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::mpsc::UnboundedReceiver;

// --- Roles ---

pub fn role(id: i64, nombre: &str, keys: &[&str]) -> Role {
    Role {
        id,
        nombre: nombre.to_string(),
        permisos: keys.iter().map(|k| k.to_string()).collect::<HashSet<_>>(),
    }
}

/// In-memory role resolver. Principals not registered resolve to `None`.
#[derive(Default)]
pub struct MockRoles {
    pub principals: HashMap<i64, Vec<Role>>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockRoles {
    pub fn with(mut self, principal: i64, roles: Vec<Role>) -> Self {
        self.principals.insert(principal, roles);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RoleResolver for MockRoles {
    async fn resolve(&self, principal: PrincipalId) -> Result<Option<ResolvedPrincipal>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Upstream(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .principals
            .get(&principal.0)
            .map(|roles| ResolvedPrincipal {
                id: principal,
                roles: roles.clone(),
            }))
    }
}

// --- Eventos ---

/// In-memory evento store. `fail_writes` makes every mutation fail as if
/// its transaction had rolled back.
#[derive(Default)]
pub struct MockEventoRepo {
    pub rows: Mutex<Vec<Evento>>,
    /// Categoria links by evento id.
    pub categorias: HashMap<i64, Vec<CategoriaEvento>>,
    pub fail_writes: bool,
    pub last_list: Mutex<Option<(EventoFilter, ListParams)>>,
}

impl MockEventoRepo {
    pub fn seeded(rows: Vec<Evento>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn rolling_back() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }
}

pub fn evento(id: i64, nombre: &str) -> Evento {
    Evento {
        id,
        nombre: nombre.to_string(),
        descripcion: format!("{nombre} descripcion"),
        cupo: "50".to_string(),
        sucursal_id: 1,
        precio: 10.0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

fn rolled_back() -> AppError {
    AppError::Upstream(sqlx::Error::Protocol("transaction rolled back".to_string()))
}

#[async_trait]
impl EventoRepository for MockEventoRepo {
    async fn create_evento(&self, req: CreateEventoRequest) -> Result<Evento, AppError> {
        if self.fail_writes {
            return Err(rolled_back());
        }
        let mut rows = self.rows.lock().unwrap();
        let created = Evento {
            id: rows.len() as i64 + 1,
            nombre: req.nombre,
            descripcion: req.descripcion,
            cupo: req.cupo,
            sucursal_id: req.sucursal_id,
            precio: req.precio,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        rows.push(created.clone());
        Ok(created)
    }

    async fn update_evento(&self, id: i64, req: UpdateEventoRequest) -> Result<Evento, AppError> {
        if self.fail_writes {
            return Err(rolled_back());
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .ok_or(AppError::NotFound(Resource::Evento))?;
        if let Some(nombre) = req.nombre {
            row.nombre = nombre;
        }
        if let Some(precio) = req.precio {
            row.precio = precio;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_evento(&self, id: i64) -> Result<Evento, AppError> {
        if self.fail_writes {
            return Err(rolled_back());
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .ok_or(AppError::NotFound(Resource::Evento))?;
        row.deleted_at = Some(Utc::now());
        Ok(row.clone())
    }

    async fn find_evento(&self, id: i64) -> Result<Option<EventoDetalle>, AppError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .map(|evento| EventoDetalle {
                evento: evento.clone(),
                categorias: self.categorias.get(&id).cloned().unwrap_or_default(),
                estados: Vec::new(),
            }))
    }

    async fn list_eventos(
        &self,
        filter: &EventoFilter,
        params: &ListParams,
    ) -> Result<(Vec<Evento>, i64), AppError> {
        *self.last_list.lock().unwrap() = Some((filter.clone(), *params));
        let window = params.window();
        let rows = self.rows.lock().unwrap();
        let live: Vec<Evento> = rows.iter().filter(|e| e.deleted_at.is_none()).cloned().collect();
        let total = live.len() as i64;
        let page = live
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect();
        Ok((page, total))
    }
}

// --- Reserva ---

#[derive(Default)]
pub struct MockReservaRepo {
    pub current: Mutex<Option<MaximosDiasReserva>>,
    pub fail_writes: bool,
}

#[async_trait]
impl ReservaRepository for MockReservaRepo {
    async fn current_maximos_dias(&self) -> Result<Option<MaximosDiasReserva>, AppError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn replace_maximos_dias(&self, valor: i32) -> Result<MaximosDiasReserva, AppError> {
        if self.fail_writes {
            return Err(rolled_back());
        }
        let mut current = self.current.lock().unwrap();
        let next_id = current.as_ref().map(|c| c.id + 1).unwrap_or(1);
        let created = MaximosDiasReserva {
            id: next_id,
            valor,
            created_at: Utc::now(),
            deleted_at: None,
        };
        *current = Some(created.clone());
        Ok(created)
    }
}

// --- Wiring ---

/// Emitter over the standard taxonomy with a single channel listener.
pub fn channel_emitter() -> (AuditEmitter, UnboundedReceiver<Arc<AuditEntry>>) {
    let (listener, rx) = ChannelAuditListener::channel();
    let emitter = AuditEmitter::builder(AuditTaxonomy::standard())
        .subscribe(listener)
        .build();
    (emitter, rx)
}

pub fn test_state(
    roles: MockRoles,
    eventos: Arc<MockEventoRepo>,
    audit: AuditEmitter,
) -> AppState {
    AppState {
        eventos: EventoService::new(eventos, audit.clone()),
        reservas: ReservaService::new(Arc::new(MockReservaRepo::default()), audit.clone()),
        gate: AuthorizationGate::new(Arc::new(roles)),
        audit,
        config: AppConfig::default(),
    }
}

/// Waits briefly for the next delivered entry.
pub async fn next_entry(rx: &mut UnboundedReceiver<Arc<AuditEntry>>) -> Option<Arc<AuditEntry>> {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .ok()
        .flatten()
}

/// True when nothing is delivered within a short grace period. A closed
/// channel counts as nothing delivered: once the emitter is dropped its
/// workers drain their queues and then close the listener.
pub async fn nothing_delivered(rx: &mut UnboundedReceiver<Arc<AuditEntry>>) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv()).await,
        Err(_) | Ok(None)
    )
}
