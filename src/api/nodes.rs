use crate::api::period::{parse_node_id, resolve_range, RangeQuery};
use crate::api::AppState;
use crate::domain::{NodeId, NodeMetrics};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildrenResponse {
    pub parent_id: NodeId,
    pub children: BTreeMap<NodeId, NodeMetrics>,
}

pub async fn get_node_metrics(
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<NodeMetrics>, AppError> {
    let id = parse_node_id("node id", &id)?;
    let (_, range) = resolve_range(&state, &params)?;
    let metrics = state.service.node_metrics(id, &range).await?;
    Ok(Json(metrics))
}

pub async fn get_children_metrics(
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<ChildrenResponse>, AppError> {
    let parent_id = parse_node_id("node id", &id)?;
    let (_, range) = resolve_range(&state, &params)?;
    let children = state.service.children_metrics(parent_id, &range).await?;
    Ok(Json(ChildrenResponse {
        parent_id,
        children,
    }))
}

pub async fn get_children_csv(
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let parent_id = parse_node_id("node id", &id)?;
    let (_, range) = resolve_range(&state, &params)?;
    let body = state.service.children_csv(parent_id, &range).await?;
    let filename = format!(
        "attachment; filename=\"{}_{}_{}.csv\"",
        parent_id,
        range.first_day(),
        range.last_day()
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}
