use crate::{
    audit::{AuditAction, AuditEmitter, AuditModel},
    context::RequestContext,
    error::{AppError, Resource},
    models::{
        CreateEventoRequest, Evento, EventoDetalle, EventoFilter, MaximosDiasReserva,
        UpdateEventoRequest,
    },
    pagination::{ListParams, PaginatedResponse},
    repository::{EventoRepositoryState, ReservaRepositoryState},
};

/// EventoService
///
/// Business operations on eventos. Mutations run through the repository,
/// which commits before returning; only then is the audit entry emitted, so a
/// failed or rolled-back mutation never produces one.
#[derive(Clone)]
pub struct EventoService {
    repo: EventoRepositoryState,
    audit: AuditEmitter,
}

impl EventoService {
    pub fn new(repo: EventoRepositoryState, audit: AuditEmitter) -> Self {
        Self { repo, audit }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateEventoRequest,
    ) -> Result<Evento, AppError> {
        let evento = self.repo.create_evento(req).await?;
        self.audit
            .emit_committed(ctx, AuditModel::Evento.event(AuditAction::Create), &evento)?;
        Ok(evento)
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        req: UpdateEventoRequest,
    ) -> Result<Evento, AppError> {
        let evento = self.repo.update_evento(id, req).await?;
        self.audit
            .emit_committed(ctx, AuditModel::Evento.event(AuditAction::Update), &evento)?;
        Ok(evento)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i64) -> Result<Evento, AppError> {
        let evento = self.repo.delete_evento(id).await?;
        self.audit
            .emit_committed(ctx, AuditModel::Evento.event(AuditAction::Delete), &evento)?;
        Ok(evento)
    }

    pub async fn find_one(&self, id: i64) -> Result<EventoDetalle, AppError> {
        self.repo
            .find_evento(id)
            .await?
            .ok_or(AppError::NotFound(Resource::Evento))
    }

    pub async fn find_all(
        &self,
        filter: &EventoFilter,
        params: &ListParams,
    ) -> Result<PaginatedResponse<Evento>, AppError> {
        tracing::debug!(?filter, ?params, "evento find_all");
        let (items, total) = self.repo.list_eventos(filter, params).await?;
        Ok(PaginatedResponse::new(items, total, params.pagination))
    }
}

/// ReservaService
///
/// Manages the single active "maximum days ahead a booking may be made"
/// setting.
#[derive(Clone)]
pub struct ReservaService {
    repo: ReservaRepositoryState,
    audit: AuditEmitter,
}

impl ReservaService {
    pub fn new(repo: ReservaRepositoryState, audit: AuditEmitter) -> Self {
        Self { repo, audit }
    }

    pub async fn current(&self) -> Result<Option<MaximosDiasReserva>, AppError> {
        self.repo.current_maximos_dias().await
    }

    pub async fn replace(
        &self,
        ctx: &RequestContext,
        valor: i32,
    ) -> Result<MaximosDiasReserva, AppError> {
        if valor < 1 {
            return Err(AppError::validation("valor", "must be a positive integer"));
        }

        let created = self.repo.replace_maximos_dias(valor).await?;
        self.audit.emit_committed(
            ctx,
            AuditModel::MaximosDiasAdelanteReserva.event(AuditAction::Update),
            &created,
        )?;
        Ok(created)
    }
}
