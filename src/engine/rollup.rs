//! Bottom-up rollup of gross figures through the reseller tree.
//!
//! Internal nodes never re-read facts: their gross figures are the sum of their
//! children's gross figures. Each node then applies its own shares to that sum,
//! which changes commission/balance/profit but never the sales/prizes a parent sees.

use super::leaf::LeafAggregator;
use super::split::{split, Shares};
use super::tree::ResellerTree;
use super::EngineError;
use crate::datasource::FactStore;
use crate::domain::{BaseMetrics, DateRange, NodeId, NodeMetrics};
use std::collections::HashMap;
use std::sync::Arc;

/// Rolled-up metrics for every node of one or more subtrees over one range.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeRollup {
    pub range: DateRange,
    metrics: HashMap<NodeId, NodeMetrics>,
}

impl SubtreeRollup {
    pub fn get(&self, id: &NodeId) -> Option<&NodeMetrics> {
        self.metrics.get(id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.metrics.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Metrics of `parent`'s direct children, in tree order.
    pub fn children_of(&self, tree: &ResellerTree, parent: &NodeId) -> Vec<NodeMetrics> {
        tree.children(parent)
            .iter()
            .filter_map(|id| self.metrics.get(id).cloned())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct RollupEngine {
    leaf: LeafAggregator,
}

impl RollupEngine {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self {
            leaf: LeafAggregator::new(store),
        }
    }

    pub fn leaf(&self) -> &LeafAggregator {
        &self.leaf
    }

    /// Roll up the subtree under `root`.
    pub async fn rollup(
        &self,
        tree: &ResellerTree,
        root: NodeId,
        range: &DateRange,
    ) -> Result<SubtreeRollup, EngineError> {
        self.rollup_many(tree, &[root], range).await
    }

    /// Roll up several disjoint subtrees with a single batched fact fetch.
    ///
    /// # Errors
    /// `UnknownNode` if a root is not in the tree; `FactStore` if any fetch fails.
    pub async fn rollup_many(
        &self,
        tree: &ResellerTree,
        roots: &[NodeId],
        range: &DateRange,
    ) -> Result<SubtreeRollup, EngineError> {
        if let Some(missing) = roots.iter().find(|id| !tree.contains(id)) {
            return Err(EngineError::UnknownNode(*missing));
        }

        let taquillas: Vec<NodeId> = roots
            .iter()
            .flat_map(|root| tree.taquillas_under(root))
            .collect();
        let leaves = self.leaf.aggregate_many(&taquillas, range).await?;

        let mut metrics = HashMap::new();
        for root in roots {
            fold_subtree(tree, root, &leaves, &mut metrics);
        }

        Ok(SubtreeRollup {
            range: *range,
            metrics,
        })
    }
}

/// Post-order fold of `root`'s subtree into `out`, given per-taquilla gross figures.
pub fn fold_subtree(
    tree: &ResellerTree,
    root: &NodeId,
    leaves: &HashMap<NodeId, BaseMetrics>,
    out: &mut HashMap<NodeId, NodeMetrics>,
) {
    for id in tree.post_order(root) {
        let Some(node) = tree.get(&id) else {
            continue;
        };

        let own = if node.kind.is_point_of_sale() {
            leaves.get(&id).copied().unwrap_or_default()
        } else {
            BaseMetrics::zero()
        };
        let base = tree
            .children(&id)
            .iter()
            .filter_map(|child| out.get(child).map(NodeMetrics::base))
            .fold(own, |acc, m| acc + m);

        let metrics = NodeMetrics::from_parts(id, node.kind, base, split(base, Shares::of(node)));
        out.insert(id, metrics);
    }
}
