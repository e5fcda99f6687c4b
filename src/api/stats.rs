use crate::api::period::{parse_node_id, resolve_range, RangeQuery};
use crate::api::AppState;
use crate::engine::Period;
use crate::error::AppError;
use crate::orchestration::{BetsStats, PeriodSummary, StatsScope};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetsStatsQuery {
    pub node_id: Option<String>,
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

async fn summary(
    state: &AppState,
    scope: StatsScope,
    params: &RangeQuery,
) -> Result<PeriodSummary, AppError> {
    let (period, range) = resolve_range(state, params)?;
    let custom = (period == Period::Custom).then_some(range);
    Ok(state.service.period_summary(scope, custom).await?)
}

pub async fn get_admin_summary(
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PeriodSummary>, AppError> {
    Ok(Json(summary(&state, StatsScope::Admin, &params).await?))
}

pub async fn get_node_summary(
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<PeriodSummary>, AppError> {
    let id = parse_node_id("node id", &id)?;
    Ok(Json(summary(&state, StatsScope::Node(id), &params).await?))
}

pub async fn get_bets_stats(
    Query(params): Query<BetsStatsQuery>,
    State(state): State<AppState>,
) -> Result<Json<BetsStats>, AppError> {
    let scope = match params.node_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(id) => StatsScope::Node(parse_node_id("nodeId", id)?),
        None => StatsScope::Admin,
    };
    let range_query = RangeQuery {
        period: params.period,
        from: params.from,
        to: params.to,
    };
    let (_, range) = resolve_range(&state, &range_query)?;
    let stats = state.service.bets_stats(scope, &range).await?;
    Ok(Json(stats))
}
