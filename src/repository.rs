use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction, query_builder::QueryBuilder, types::Json};

use crate::{
    audit::AuditEntry,
    context::PrincipalId,
    error::{AppError, Resource},
    models::{
        CategoriaEvento, CreateEventoRequest, EstadoEvento, Evento, EventoDetalle, EventoFilter,
        MaximosDiasReserva, UpdateEventoRequest,
    },
    pagination::ListParams,
    rbac::{ResolvedPrincipal, Role, RoleResolver},
};

/// EventoRepository
///
/// Persistence contract for eventos. Every mutating method is a single
/// transaction and returns `Ok` only once that transaction has committed;
/// any error means nothing was written.
#[async_trait]
pub trait EventoRepository: Send + Sync {
    async fn create_evento(&self, req: CreateEventoRequest) -> Result<Evento, AppError>;
    async fn update_evento(&self, id: i64, req: UpdateEventoRequest) -> Result<Evento, AppError>;
    /// Soft delete. Returns the row as it was committed.
    async fn delete_evento(&self, id: i64) -> Result<Evento, AppError>;
    /// The live evento with its categoria and estado links.
    async fn find_evento(&self, id: i64) -> Result<Option<EventoDetalle>, AppError>;
    /// One page of eventos plus the total number of matches.
    async fn list_eventos(
        &self,
        filter: &EventoFilter,
        params: &ListParams,
    ) -> Result<(Vec<Evento>, i64), AppError>;
}

/// ReservaRepository
///
/// Persistence contract for the booking-horizon setting.
#[async_trait]
pub trait ReservaRepository: Send + Sync {
    async fn current_maximos_dias(&self) -> Result<Option<MaximosDiasReserva>, AppError>;
    /// Soft-deletes the active value and inserts `valor` in one transaction.
    async fn replace_maximos_dias(&self, valor: i32) -> Result<MaximosDiasReserva, AppError>;
}

/// AuditStore
///
/// Durable sink behind the persistence audit listener.
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), sqlx::Error>;
}

pub type EventoRepositoryState = Arc<dyn EventoRepository>;
pub type ReservaRepositoryState = Arc<dyn ReservaRepository>;
pub type AuditStoreState = Arc<dyn AuditStore>;

/// PostgresRepository
///
/// The Postgres implementation of every repository contract and of the
/// `RoleResolver`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const EVENTO_COLUMNS: &str = "e.id, e.nombre, e.descripcion, e.cupo, e.sucursal_id, e.precio, \
     e.created_at, e.updated_at, e.deleted_at";

const EVENTO_RETURNING: &str = "RETURNING id, nombre, descripcion, cupo, sucursal_id, precio, \
     created_at, updated_at, deleted_at";

/// Appends the FROM / JOIN / WHERE part shared by the list and count queries.
/// Relation filters become inner joins so they narrow the result set.
fn push_evento_scope(builder: &mut QueryBuilder<'_, Postgres>, filter: &EventoFilter) {
    builder.push(" FROM eventos e");

    if let Some(categoria_id) = filter.categoria_id {
        builder.push(" JOIN evento_categorias ec ON ec.evento_id = e.id AND ec.categoria_id = ");
        builder.push_bind(categoria_id);
    }
    if let Some(estado_id) = filter.estado_id {
        builder.push(" JOIN evento_estados ee ON ee.evento_id = e.id AND ee.estado_id = ");
        builder.push_bind(estado_id);
    }
    if let Some(bodega_id) = &filter.bodega_id {
        builder.push(" JOIN sucursales s ON s.id = e.sucursal_id AND s.bodega_id = ");
        builder.push_bind(bodega_id.clone());
    }

    builder.push(" WHERE e.deleted_at IS NULL");

    if let Some(sucursal_id) = filter.sucursal_id {
        builder.push(" AND e.sucursal_id = ");
        builder.push_bind(sucursal_id);
    }
    if let Some(desde) = filter.fecha_desde {
        builder.push(" AND e.created_at >= ");
        builder.push_bind(desde);
    }
    if let Some(hasta) = filter.fecha_hasta {
        builder.push(" AND e.created_at <= ");
        builder.push_bind(hasta);
    }
    if let Some(precio_maximo) = filter.precio_maximo {
        builder.push(" AND e.precio <= ");
        builder.push_bind(precio_maximo);
    }
    if let Some(nombre) = &filter.nombre {
        builder.push(" AND e.nombre ILIKE ");
        builder.push_bind(format!("%{}%", nombre));
    }
}

/// Replaces the evento's estado link. The estado must exist.
async fn set_estado(
    tx: &mut Transaction<'_, Postgres>,
    evento_id: i64,
    estado_id: i64,
) -> Result<(), AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM estados_evento WHERE id = $1)")
        .bind(estado_id)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(AppError::NotFound(Resource::EstadoEvento));
    }

    sqlx::query("DELETE FROM evento_estados WHERE evento_id = $1")
        .bind(evento_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO evento_estados (evento_id, estado_id) VALUES ($1, $2)")
        .bind(evento_id)
        .bind(estado_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Replaces the evento's categoria link. The categoria must exist.
async fn set_categoria(
    tx: &mut Transaction<'_, Postgres>,
    evento_id: i64,
    categoria_id: i64,
) -> Result<(), AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categorias_evento WHERE id = $1)")
            .bind(categoria_id)
            .fetch_one(&mut **tx)
            .await?;
    if !exists {
        return Err(AppError::NotFound(Resource::CategoriaEvento));
    }

    sqlx::query("DELETE FROM evento_categorias WHERE evento_id = $1")
        .bind(evento_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO evento_categorias (evento_id, categoria_id) VALUES ($1, $2)")
        .bind(evento_id)
        .bind(categoria_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl EventoRepository for PostgresRepository {
    async fn create_evento(&self, req: CreateEventoRequest) -> Result<Evento, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO eventos (nombre, descripcion, cupo, sucursal_id, precio, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) {EVENTO_RETURNING}"
        );
        let evento = sqlx::query_as::<_, Evento>(&sql)
            .bind(&req.nombre)
            .bind(&req.descripcion)
            .bind(&req.cupo)
            .bind(req.sucursal_id)
            .bind(req.precio)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(estado_id) = req.estado_id {
            set_estado(&mut tx, evento.id, estado_id).await?;
        }
        if let Some(categoria_id) = req.categoria_id {
            set_categoria(&mut tx, evento.id, categoria_id).await?;
        }

        tx.commit().await?;
        Ok(evento)
    }

    async fn update_evento(&self, id: i64, req: UpdateEventoRequest) -> Result<Evento, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE eventos \
             SET nombre = COALESCE($2, nombre), \
                 descripcion = COALESCE($3, descripcion), \
                 cupo = COALESCE($4, cupo), \
                 sucursal_id = COALESCE($5, sucursal_id), \
                 precio = COALESCE($6, precio), \
                 updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL {EVENTO_RETURNING}"
        );
        let evento = sqlx::query_as::<_, Evento>(&sql)
            .bind(id)
            .bind(&req.nombre)
            .bind(&req.descripcion)
            .bind(&req.cupo)
            .bind(req.sucursal_id)
            .bind(req.precio)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound(Resource::Evento))?;

        if let Some(estado_id) = req.estado_id {
            set_estado(&mut tx, evento.id, estado_id).await?;
        }
        if let Some(categoria_id) = req.categoria_id {
            set_categoria(&mut tx, evento.id, categoria_id).await?;
        }

        tx.commit().await?;
        Ok(evento)
    }

    async fn delete_evento(&self, id: i64) -> Result<Evento, AppError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE eventos SET deleted_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL {EVENTO_RETURNING}"
        );
        let evento = sqlx::query_as::<_, Evento>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound(Resource::Evento))?;

        tx.commit().await?;
        Ok(evento)
    }

    async fn find_evento(&self, id: i64) -> Result<Option<EventoDetalle>, AppError> {
        let sql = format!("SELECT {EVENTO_COLUMNS} FROM eventos e WHERE e.id = $1 AND e.deleted_at IS NULL");
        let Some(evento) = sqlx::query_as::<_, Evento>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let (categorias, estados) = tokio::try_join!(
            sqlx::query_as::<_, CategoriaEvento>(
                "SELECT c.id, c.nombre FROM categorias_evento c \
                 JOIN evento_categorias ec ON ec.categoria_id = c.id \
                 WHERE ec.evento_id = $1 ORDER BY c.id",
            )
            .bind(id)
            .fetch_all(&self.pool),
            sqlx::query_as::<_, EstadoEvento>(
                "SELECT s.id, s.nombre FROM estados_evento s \
                 JOIN evento_estados ee ON ee.estado_id = s.id \
                 WHERE ee.evento_id = $1 ORDER BY s.id",
            )
            .bind(id)
            .fetch_all(&self.pool),
        )?;

        Ok(Some(EventoDetalle {
            evento,
            categorias,
            estados,
        }))
    }

    async fn list_eventos(
        &self,
        filter: &EventoFilter,
        params: &ListParams,
    ) -> Result<(Vec<Evento>, i64), AppError> {
        let window = params.window();

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {EVENTO_COLUMNS}"));
        push_evento_scope(&mut select, filter);
        params.order.push_to(&mut select, "e");
        select.push(" LIMIT ");
        select.push_bind(window.limit);
        select.push(" OFFSET ");
        select.push_bind(window.offset);

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        push_evento_scope(&mut count, filter);

        let (items, total) = tokio::try_join!(
            select.build_query_as::<Evento>().fetch_all(&self.pool),
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )?;

        Ok((items, total))
    }
}

#[async_trait]
impl ReservaRepository for PostgresRepository {
    async fn current_maximos_dias(&self) -> Result<Option<MaximosDiasReserva>, AppError> {
        let current = sqlx::query_as::<_, MaximosDiasReserva>(
            "SELECT id, valor, created_at, deleted_at FROM maximos_dias_adelante_reserva \
             WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(current)
    }

    async fn replace_maximos_dias(&self, valor: i32) -> Result<MaximosDiasReserva, AppError> {
        let mut tx = self.pool.begin().await?;

        let retired = sqlx::query(
            "UPDATE maximos_dias_adelante_reserva SET deleted_at = NOW() WHERE deleted_at IS NULL",
        )
        .execute(&mut *tx)
        .await?;
        if retired.rows_affected() > 0 {
            tracing::info!("retiring current maximos dias adelante reserva");
        }

        let created = sqlx::query_as::<_, MaximosDiasReserva>(
            "INSERT INTO maximos_dias_adelante_reserva (valor, created_at) VALUES ($1, NOW()) \
             RETURNING id, valor, created_at, deleted_at",
        )
        .bind(valor)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }
}

#[async_trait]
impl AuditStore for PostgresRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auditoria (tipo_evento, valor, actor_id, trace_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.event().as_str())
        .bind(Json(entry.payload()))
        .bind(entry.actor_id().map(|actor| actor.0))
        .bind(entry.trace_id())
        .bind(entry.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: i64,
    role_nombre: String,
    clave: Option<String>,
}

#[async_trait]
impl RoleResolver for PostgresRepository {
    async fn resolve(&self, principal: PrincipalId) -> Result<Option<ResolvedPrincipal>, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM usuarios WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(principal.0)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Ok(None);
        }

        // One row per (role, permission); roles without permissions yield a NULL clave.
        let rows = sqlx::query_as::<_, RolePermissionRow>(
            "SELECT r.id AS role_id, r.nombre AS role_nombre, p.clave AS clave \
             FROM usuario_roles ur \
             JOIN roles r ON r.id = ur.role_id \
             LEFT JOIN role_permisos rp ON rp.role_id = r.id \
             LEFT JOIN permisos p ON p.id = rp.permiso_id \
             WHERE ur.usuario_id = $1 \
             ORDER BY r.id",
        )
        .bind(principal.0)
        .fetch_all(&self.pool)
        .await?;

        let mut roles: Vec<Role> = Vec::new();
        for row in rows {
            if roles.last().map(|role| role.id) != Some(row.role_id) {
                roles.push(Role {
                    id: row.role_id,
                    nombre: row.role_nombre,
                    permisos: HashSet::new(),
                });
            }
            if let (Some(role), Some(clave)) = (roles.last_mut(), row.clave) {
                role.permisos.insert(clave);
            }
        }

        Ok(Some(ResolvedPrincipal {
            id: principal,
            roles,
        }))
    }
}
