//! Rollup computation: period resolution, leaf aggregation, the reseller tree,
//! commission split and the hierarchical dashboard view.

use crate::datasource::FactStoreError;
use crate::domain::NodeId;
use chrono::NaiveDate;
use thiserror::Error;

pub mod hierarchy;
pub mod leaf;
pub mod period;
pub mod rollup;
pub mod session;
pub mod split;
pub mod tree;

pub use hierarchy::{
    compute_root, expand, root_scope, spawn_expand, CurrentUser, Expansion, HierarchyEntity,
    HierarchyRoot, PeriodMetrics, PeriodRanges,
};
pub use leaf::LeafAggregator;
pub use period::{CustomRange, Period, PeriodResolver};
pub use rollup::{RollupEngine, SubtreeRollup};
pub use session::RollupSession;
pub use split::{split, Shares};
pub use tree::ResellerTree;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid range: {to} is before {from}")]
    InvalidRange { from: NaiveDate, to: NaiveDate },
    #[error("Custom period requires a start date")]
    MissingCustomRange,
    #[error("Unknown reseller node: {0}")]
    UnknownNode(NodeId),
    #[error(transparent)]
    FactStore(#[from] FactStoreError),
}
