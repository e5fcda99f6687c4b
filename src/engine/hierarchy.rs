//! Hierarchical dashboard view: one level of rows at a time, each with the
//! today/week/month figures plus the currently applied range.
//!
//! Deeper levels are produced only when a row is expanded. Row order follows
//! the tree's listing order; presentation sorts as it likes.

use super::session::RollupSession;
use super::EngineError;
use crate::domain::{DateRange, NodeId, NodeKind, NodeMetrics};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// Who is looking at the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub role: NodeKind,
    /// The caller's own node; `None` for admins.
    pub node_id: Option<NodeId>,
}

impl CurrentUser {
    pub fn admin() -> Self {
        Self {
            role: NodeKind::Admin,
            node_id: None,
        }
    }

    pub fn at(role: NodeKind, node_id: NodeId) -> Self {
        Self {
            role,
            node_id: Some(node_id),
        }
    }
}

/// The four ranges every row is evaluated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRanges {
    pub today: DateRange,
    pub week: DateRange,
    pub month: DateRange,
    pub custom: DateRange,
}

impl PeriodRanges {
    fn all(&self) -> [DateRange; 4] {
        [self.today, self.week, self.month, self.custom]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodMetrics {
    pub today: NodeMetrics,
    pub week: NodeMetrics,
    pub month: NodeMetrics,
    pub custom: NodeMetrics,
}

/// One expandable dashboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyEntity {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub is_active: bool,
    pub child_count: usize,
    pub periods: PeriodMetrics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRoot {
    pub root_type: NodeKind,
    pub root_entities: Vec<HierarchyEntity>,
}

/// Starting kind and first-level rows for `user`.
///
/// Admins (or callers without a node) see the top-level entities; everyone else
/// sees their own node's children, or their own node when it has none.
pub fn root_scope(session: &RollupSession, user: &CurrentUser) -> (NodeKind, Vec<NodeId>) {
    let tree = session.tree();
    let node_id = match (user.role, user.node_id) {
        (NodeKind::Admin, _) | (_, None) => return (NodeKind::Admin, tree.top_level()),
        (_, Some(id)) => id,
    };

    match tree.get(&node_id) {
        Some(node) => {
            let children = tree.children(&node_id);
            if children.is_empty() {
                (node.kind, vec![node_id])
            } else {
                (node.kind, children.to_vec())
            }
        }
        None => {
            warn!("Caller node {} not found in reseller tree", node_id);
            (user.role, Vec::new())
        }
    }
}

/// Root level of the dashboard for `user`.
pub async fn compute_root(
    session: &RollupSession,
    user: &CurrentUser,
    ranges: &PeriodRanges,
) -> Result<HierarchyRoot, EngineError> {
    let (root_type, ids) = root_scope(session, user);
    let root_entities = entities(session, &ids, ranges).await?;
    Ok(HierarchyRoot {
        root_type,
        root_entities,
    })
}

/// Rows for the children of `parent` (drill-down of one row).
pub async fn expand(
    session: &RollupSession,
    parent: NodeId,
    ranges: &PeriodRanges,
) -> Result<Vec<HierarchyEntity>, EngineError> {
    let tree = session.tree();
    if !tree.contains(&parent) {
        return Err(EngineError::UnknownNode(parent));
    }
    let ids = tree.children(&parent).to_vec();
    entities(session, &ids, ranges).await
}

/// Run [`expand`] on its own task.
///
/// The returned [`Expansion`] aborts the task when dropped, so a collapsed row or a
/// disconnected caller abandons the in-flight fetch. Rows already rendered are untouched.
pub fn spawn_expand(
    session: Arc<RollupSession>,
    parent: NodeId,
    ranges: PeriodRanges,
) -> Expansion {
    Expansion {
        handle: tokio::spawn(async move { expand(&session, parent, &ranges).await }),
    }
}

/// Handle to a running drill-down. Resolves like a `JoinHandle`; aborts on drop.
#[derive(Debug)]
pub struct Expansion {
    handle: JoinHandle<Result<Vec<HierarchyEntity>, EngineError>>,
}

impl Expansion {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Future for Expansion {
    type Output = Result<Result<Vec<HierarchyEntity>, EngineError>, JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx)
    }
}

impl Drop for Expansion {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Evaluate `ids` over all four ranges; the ranges are independent and run concurrently.
async fn entities(
    session: &RollupSession,
    ids: &[NodeId],
    ranges: &PeriodRanges,
) -> Result<Vec<HierarchyEntity>, EngineError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let [today, week, month, custom] = ranges.all();
    let (today, week, month, custom) = futures::try_join!(
        session.subtrees(ids, &today),
        session.subtrees(ids, &week),
        session.subtrees(ids, &month),
        session.subtrees(ids, &custom),
    )?;

    let tree = session.tree();
    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let (Some(node), Some(t), Some(w), Some(m), Some(c)) = (
            tree.get(id),
            today.get(id),
            week.get(id),
            month.get(id),
            custom.get(id),
        ) else {
            continue;
        };
        rows.push(HierarchyEntity {
            node_id: *id,
            kind: node.kind,
            name: node.name.clone(),
            is_active: node.is_active,
            child_count: tree.children(id).len(),
            periods: PeriodMetrics {
                today: t.clone(),
                week: w.clone(),
                month: m.clone(),
                custom: c.clone(),
            },
        });
    }
    Ok(rows)
}
