use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    context::RequestContext,
    error::{AppError, ErrorBody},
    extract::{ValidJson, ValidPath, ValidQuery},
    models::{
        CreateEventoRequest, EVENTO_ORDER_BY, Evento, EventoDetalle, EventoFilter,
        MaximosDiasReserva, SetMaximosDiasRequest, UpdateEventoRequest,
    },
    pagination::{PageQuery, PaginatedResponse},
};

/// route_not_found
///
/// Fallback for unmatched paths and methods. Renders the same body a denied
/// request gets.
pub async fn route_not_found() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ErrorBody::not_found()))
}

// --- Eventos ---

/// list_eventos
///
/// [Public Route] Paginated, ordered and filtered listing. Pagination and
/// order are validated against the evento whitelist before any query runs.
pub async fn list_eventos(
    State(state): State<AppState>,
    ValidQuery(page): ValidQuery<PageQuery>,
    ValidQuery(filter): ValidQuery<EventoFilter>,
) -> Result<Json<PaginatedResponse<Evento>>, AppError> {
    let params = page.validate(EVENTO_ORDER_BY)?;
    let eventos = state.eventos.find_all(&filter, &params).await?;
    Ok(Json(eventos))
}

/// get_evento
///
/// [Public Route] Includes the linked categorias and estados.
pub async fn get_evento(
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<EventoDetalle>, AppError> {
    Ok(Json(state.eventos.find_one(id).await?))
}

/// create_evento
///
/// [Authenticated Route, `eventos:write`]
pub async fn create_evento(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateEventoRequest>,
) -> Result<Json<Evento>, AppError> {
    Ok(Json(state.eventos.create(&ctx, payload).await?))
}

/// update_evento
///
/// [Authenticated Route, `eventos:write`] Partial update.
pub async fn update_evento(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
    ValidJson(payload): ValidJson<UpdateEventoRequest>,
) -> Result<Json<Evento>, AppError> {
    Ok(Json(state.eventos.update(&ctx, id, payload).await?))
}

/// delete_evento
///
/// [Authenticated Route, `eventos:write`] Soft delete; returns the deleted row.
pub async fn delete_evento(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidPath(id): ValidPath<i64>,
) -> Result<Json<Evento>, AppError> {
    Ok(Json(state.eventos.delete(&ctx, id).await?))
}

// --- Maximos dias adelante reserva ---

/// get_maximos_dias
///
/// [Admin Route, `sudo`] The active value, or `null` when none is set.
pub async fn get_maximos_dias(
    State(state): State<AppState>,
) -> Result<Json<Option<MaximosDiasReserva>>, AppError> {
    Ok(Json(state.reservas.current().await?))
}

/// put_maximos_dias
///
/// [Admin Route, `sudo`] Replaces the active value.
pub async fn put_maximos_dias(
    ctx: RequestContext,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SetMaximosDiasRequest>,
) -> Result<Json<MaximosDiasReserva>, AppError> {
    Ok(Json(state.reservas.replace(&ctx, payload.valor).await?))
}
