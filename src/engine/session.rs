//! One render cycle: a tree snapshot plus the rollups computed against it.
//!
//! A session is built per request and dropped with it. Rollups are memoized by
//! range; because a subtree rollup carries every descendant's metrics, a later
//! drill-down into any of those descendants is served from memory.

use super::rollup::{RollupEngine, SubtreeRollup};
use super::tree::ResellerTree;
use super::EngineError;
use crate::domain::{DateRange, NodeId};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug)]
pub struct RollupSession {
    tree: Arc<ResellerTree>,
    engine: RollupEngine,
    memo: Mutex<Vec<Arc<SubtreeRollup>>>,
}

impl RollupSession {
    pub fn new(tree: Arc<ResellerTree>, engine: RollupEngine) -> Self {
        Self {
            tree,
            engine,
            memo: Mutex::new(Vec::new()),
        }
    }

    pub fn tree(&self) -> &ResellerTree {
        &self.tree
    }

    pub fn engine(&self) -> &RollupEngine {
        &self.engine
    }

    /// Rollup covering all of `roots` over `range`, computed at most once per
    /// session unless two identical requests race (both results are equal).
    pub async fn subtrees(
        &self,
        roots: &[NodeId],
        range: &DateRange,
    ) -> Result<Arc<SubtreeRollup>, EngineError> {
        if let Some(hit) = self.cached(roots, range) {
            debug!("Rollup cache hit for {} roots", roots.len());
            return Ok(hit);
        }

        let rollup = Arc::new(self.engine.rollup_many(&self.tree, roots, range).await?);
        if let Ok(mut memo) = self.memo.lock() {
            memo.push(rollup.clone());
        }
        Ok(rollup)
    }

    fn cached(&self, roots: &[NodeId], range: &DateRange) -> Option<Arc<SubtreeRollup>> {
        let memo = self.memo.lock().ok()?;
        memo.iter()
            .find(|r| r.range == *range && roots.iter().all(|id| r.contains(id)))
            .cloned()
    }

    /// Number of rollups held, for diagnostics.
    pub fn cached_len(&self) -> usize {
        self.memo.lock().map(|m| m.len()).unwrap_or(0)
    }
}
