use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::error::AppError;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_ORDER_BY: &str = "id:asc";

/// PageQuery
///
/// Raw, untrusted pagination parameters exactly as they arrive in the query
/// string. Nothing here is used to build SQL until `validate` succeeds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

impl PageQuery {
    /// validate
    ///
    /// Applies defaults (page 1, limit 10, `id:asc`), coerces page/limit to
    /// positive integers and resolves the order against `allowed`.
    pub fn validate(&self, allowed: &[&'static str]) -> Result<ListParams, AppError> {
        let page = coerce_positive("page", self.page.as_deref(), DEFAULT_PAGE)?;
        let limit = coerce_positive("limit", self.limit.as_deref(), DEFAULT_LIMIT)?;
        let order = resolve_order(self.order_by.as_deref().unwrap_or(DEFAULT_ORDER_BY), allowed)?;

        // The offset must fit a Postgres BIGINT.
        if i64::from(page - 1).checked_mul(i64::from(limit)).is_none() {
            return Err(AppError::validation("page", "page * limit is out of range"));
        }

        Ok(ListParams {
            pagination: Pagination { page, limit },
            order,
        })
    }
}

fn coerce_positive(field: &str, raw: Option<&str>, default: u32) -> Result<u32, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(AppError::validation(field, "must be a positive integer")),
    }
}

/// Pagination
///
/// Validated page/limit, both at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// PageWindow
///
/// The `LIMIT` / `OFFSET` pair for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

/// plan
///
/// `offset = (page - 1) * limit`, saturating at `i64::MAX`.
pub fn plan(params: Pagination) -> PageWindow {
    let limit = i64::from(params.limit);
    let offset = i64::from(params.page.saturating_sub(1)).saturating_mul(limit);
    PageWindow { limit, offset }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// OrderDirective
///
/// A resolved sort. `attribute` always points into the caller's whitelist,
/// never into request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderDirective {
    attribute: &'static str,
    direction: SortDirection,
}

impl OrderDirective {
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Appends ` ORDER BY "<attribute>" <ASC|DESC>` qualified with `table`.
    pub fn push_to(&self, builder: &mut QueryBuilder<'_, Postgres>, table: &'static str) {
        builder.push(" ORDER BY ");
        builder.push(table);
        builder.push(".\"");
        builder.push(self.attribute);
        builder.push("\" ");
        builder.push(self.direction.as_sql());
    }
}

/// resolve_order
///
/// Parses `<attribute>:<asc|desc>`. Fails on a malformed string, an attribute
/// outside `allowed`, or any other direction.
pub fn resolve_order(
    order_by: &str,
    allowed: &[&'static str],
) -> Result<OrderDirective, AppError> {
    const MESSAGE: &str = "must be in format <attribute>:<asc|desc> with a sortable attribute";

    let (attribute, direction) = order_by
        .split_once(':')
        .ok_or_else(|| AppError::validation("orderBy", MESSAGE))?;

    let attribute = allowed
        .iter()
        .copied()
        .find(|candidate| *candidate == attribute)
        .ok_or_else(|| AppError::validation("orderBy", MESSAGE))?;

    let direction = match direction {
        "asc" => SortDirection::Asc,
        "desc" => SortDirection::Desc,
        _ => return Err(AppError::validation("orderBy", MESSAGE)),
    };

    Ok(OrderDirective {
        attribute,
        direction,
    })
}

/// ListParams
///
/// Validated pagination plus order for one list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub pagination: Pagination,
    pub order: OrderDirective,
}

impl ListParams {
    pub fn window(&self) -> PageWindow {
        plan(self.pagination)
    }
}

/// PaginatedResponse
///
/// Envelope returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_pages: i64,
    pub current_page: i64,
    pub total_items: i64,
    pub items_per_page: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_items: i64, pagination: Pagination) -> Self {
        let limit = i64::from(pagination.limit);
        Self {
            items,
            meta: PageMeta {
                total_pages: (total_items + limit - 1) / limit,
                current_page: i64::from(pagination.page),
                total_items,
                items_per_page: limit,
            },
        }
    }
}
