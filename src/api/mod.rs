pub mod health;
pub mod hierarchy;
pub mod nodes;
pub mod period;
pub mod stats;

use crate::orchestration::StatsService;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatsService>,
}

impl AppState {
    pub fn new(service: Arc<StatsService>) -> Self {
        Self { service }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/period", get(period::get_period))
        .route("/v1/summary", get(stats::get_admin_summary))
        .route("/v1/stats/bets", get(stats::get_bets_stats))
        .route("/v1/nodes/:id/metrics", get(nodes::get_node_metrics))
        .route("/v1/nodes/:id/children", get(nodes::get_children_metrics))
        .route("/v1/nodes/:id/children.csv", get(nodes::get_children_csv))
        .route("/v1/nodes/:id/summary", get(stats::get_node_summary))
        .route("/v1/hierarchy", get(hierarchy::get_hierarchy))
        .route(
            "/v1/hierarchy/:id/children",
            get(hierarchy::get_hierarchy_children),
        )
        .layer(cors)
        .with_state(state)
}
