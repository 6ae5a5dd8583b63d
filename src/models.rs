use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use sqlx::FromRow;

// --- Core Schemas (Mapped to Database) ---

/// Evento
///
/// An event held at a sucursal (venue). Soft-deleted rows keep `deleted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, Default)]
#[serde(rename_all = "camelCase")]
pub struct Evento {
    pub id: i64,
    pub nombre: String,
    pub descripcion: String,
    pub cupo: String,
    pub sucursal_id: i64,
    pub precio: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoriaEvento {
    pub id: i64,
    pub nombre: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EstadoEvento {
    pub id: i64,
    pub nombre: String,
}

/// EventoDetalle
///
/// A single evento together with its linked categorias and estados, as
/// returned by `GET /eventos/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventoDetalle {
    #[serde(flatten)]
    pub evento: Evento,
    pub categorias: Vec<CategoriaEvento>,
    pub estados: Vec<EstadoEvento>,
}

/// Attributes clients may sort eventos by.
pub const EVENTO_ORDER_BY: &[&str] = &[
    "id",
    "nombre",
    "precio",
    "descripcion",
    "cupo",
    "sucursal_id",
    "created_at",
    "updated_at",
];

/// MaximosDiasReserva
///
/// How many days ahead a booking may be made. Only one row is active at a
/// time; replacing it soft-deletes the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, Default)]
#[serde(rename_all = "camelCase")]
pub struct MaximosDiasReserva {
    pub id: i64,
    pub valor: i32,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

// --- Request Payloads ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventoRequest {
    pub nombre: String,
    pub descripcion: String,
    pub cupo: String,
    pub sucursal_id: i64,
    pub precio: f64,
    pub estado_id: Option<i64>,
    pub categoria_id: Option<i64>,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventoRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nombre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cupo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sucursal_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categoria_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMaximosDiasRequest {
    pub valor: i32,
}

/// EventoFilter
///
/// Entity-specific filters accepted by `GET /eventos`, next to the shared
/// pagination parameters.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventoFilter {
    pub sucursal_id: Option<i64>,
    pub categoria_id: Option<i64>,
    pub estado_id: Option<i64>,
    pub bodega_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_fecha")]
    pub fecha_desde: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_fecha")]
    pub fecha_hasta: Option<DateTime<Utc>>,
    pub precio_maximo: Option<f64>,
    pub nombre: Option<String>,
}

/// Accepts an RFC 3339 timestamp or a plain `YYYY-MM-DD` date, the latter
/// read as midnight UTC.
fn deserialize_fecha<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| Some(date.and_time(NaiveTime::MIN).and_utc()))
        .map_err(|_| D::Error::custom(format!("`{raw}` is not a date or RFC 3339 timestamp")))
}
