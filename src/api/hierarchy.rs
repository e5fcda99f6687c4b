use crate::api::period::{parse_node_id, resolve_range, RangeQuery};
use crate::api::AppState;
use crate::domain::NodeKind;
use crate::engine::{CurrentUser, HierarchyEntity, HierarchyRoot};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyQuery {
    pub role: Option<String>,
    pub node_id: Option<String>,
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn current_user(params: &HierarchyQuery) -> Result<CurrentUser, AppError> {
    let role = match params.role.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(role) => NodeKind::from_str(role).map_err(AppError::BadRequest)?,
        None => NodeKind::Admin,
    };
    let node_id = params
        .node_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_node_id("nodeId", s))
        .transpose()?;
    Ok(CurrentUser { role, node_id })
}

pub async fn get_hierarchy(
    Query(params): Query<HierarchyQuery>,
    State(state): State<AppState>,
) -> Result<Json<HierarchyRoot>, AppError> {
    let user = current_user(&params)?;
    let range_query = RangeQuery {
        period: params.period,
        from: params.from,
        to: params.to,
    };
    let (_, applied) = resolve_range(&state, &range_query)?;
    let root = state.service.hierarchy_root(&user, applied).await?;
    Ok(Json(root))
}

/// Expand one row: the next level under `id`.
pub async fn get_hierarchy_children(
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<HierarchyEntity>>, AppError> {
    let parent = parse_node_id("node id", &id)?;
    let (_, applied) = resolve_range(&state, &params)?;
    let rows = state.service.hierarchy_children(parent, applied).await?;
    Ok(Json(rows))
}
