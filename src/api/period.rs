use crate::api::AppState;
use crate::domain::{DateRange, NodeId};
use crate::engine::{CustomRange, Period};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// `period`, `from`, `to` as sent by every range-scoped endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodResponse {
    pub period: Period,
    pub from: String,
    pub to: String,
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
}

pub(crate) fn parse_day(field: &str, input: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("{} must be a YYYY-MM-DD date", field)))
}

pub(crate) fn parse_node_id(field: &str, input: &str) -> Result<NodeId, AppError> {
    NodeId::from_str(input).map_err(|_| AppError::BadRequest(format!("Invalid {}", field)))
}

/// Period token plus optional custom days. A `from` without a token means `custom`.
pub(crate) fn parse_period(
    period: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(Period, Option<CustomRange>), AppError> {
    let from = from
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_day("from", s))
        .transpose()?;
    let to = to
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_day("to", s))
        .transpose()?;

    let period = match period.map(str::trim).filter(|s| !s.is_empty()) {
        Some(token) => Period::from_str(token).map_err(AppError::BadRequest)?,
        None if from.is_some() => Period::Custom,
        None => Period::Today,
    };
    Ok((period, from.map(|from| CustomRange::new(from, to))))
}

pub(crate) fn resolve_range(
    state: &AppState,
    query: &RangeQuery,
) -> Result<(Period, DateRange), AppError> {
    let (period, custom) = parse_period(
        query.period.as_deref(),
        query.from.as_deref(),
        query.to.as_deref(),
    )?;
    let range = state.service.resolve_period(period, custom)?;
    Ok((period, range))
}

pub async fn get_period(
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PeriodResponse>, AppError> {
    let (period, range) = resolve_range(&state, &params)?;
    Ok(Json(PeriodResponse {
        period,
        from: range.from.to_rfc3339(),
        to: range.to.to_rfc3339(),
        first_day: range.first_day(),
        last_day: range.last_day(),
    }))
}
