//! Request-level entry points: each call loads the node list, builds the tree
//! once and evaluates everything it needs against that single snapshot.

use super::report::{children_to_csv, BetsStats, Figures, PeriodSummary, StatsScope};
use crate::datasource::{FactStore, FactStoreError, TaquillaScope, WinnerScope};
use crate::domain::{BaseMetrics, DateRange, NodeId, NodeMetrics};
use crate::engine::{
    compute_root, spawn_expand, split, CurrentUser, CustomRange, EngineError, HierarchyEntity,
    HierarchyRoot, Period, PeriodRanges, PeriodResolver, ResellerTree, RollupEngine,
    RollupSession, Shares,
};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<FactStoreError> for ServiceError {
    fn from(err: FactStoreError) -> Self {
        ServiceError::Engine(EngineError::FactStore(err))
    }
}

#[derive(Debug, Clone)]
pub struct StatsService {
    store: Arc<dyn FactStore>,
    resolver: PeriodResolver,
}

impl StatsService {
    pub fn new(store: Arc<dyn FactStore>, resolver: PeriodResolver) -> Self {
        Self { store, resolver }
    }

    pub fn resolver(&self) -> &PeriodResolver {
        &self.resolver
    }

    pub fn resolve_period(
        &self,
        period: Period,
        custom: Option<CustomRange>,
    ) -> Result<DateRange, ServiceError> {
        Ok(self.resolver.resolve_now(period, custom)?)
    }

    /// Today/week/month at `now`, with `applied` as the fourth column.
    pub fn period_ranges(
        &self,
        applied: DateRange,
        now: DateTime<Utc>,
    ) -> Result<PeriodRanges, ServiceError> {
        Ok(PeriodRanges {
            today: self.resolver.resolve(Period::Today, None, now)?,
            week: self.resolver.resolve(Period::Week, None, now)?,
            month: self.resolver.resolve(Period::Month, None, now)?,
            custom: applied,
        })
    }

    /// Fresh tree snapshot and an empty rollup memo for one request.
    pub async fn new_session(&self) -> Result<Arc<RollupSession>, ServiceError> {
        let nodes = self.store.list_reseller_nodes().await?;
        let tree = ResellerTree::build(nodes);
        debug!(
            "Built reseller tree: {} nodes, {} roots, {} repaired",
            tree.len(),
            tree.roots().len(),
            tree.detached().len()
        );
        Ok(Arc::new(RollupSession::new(
            Arc::new(tree),
            RollupEngine::new(self.store.clone()),
        )))
    }

    /// Rolled-up metrics of a single node.
    pub async fn node_metrics(
        &self,
        id: NodeId,
        range: &DateRange,
    ) -> Result<NodeMetrics, ServiceError> {
        let session = self.new_session().await?;
        let rollup = session.subtrees(&[id], range).await?;
        rollup
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownNode(id).into())
    }

    /// Metrics of each direct child of `parent`, keyed by child id.
    pub async fn children_metrics(
        &self,
        parent: NodeId,
        range: &DateRange,
    ) -> Result<BTreeMap<NodeId, NodeMetrics>, ServiceError> {
        let session = self.new_session().await?;
        let rollup = session.subtrees(&[parent], range).await?;
        Ok(rollup
            .children_of(session.tree(), &parent)
            .into_iter()
            .map(|m| (m.node_id, m))
            .collect())
    }

    /// Children breakdown of `parent` as CSV, in tree order.
    pub async fn children_csv(
        &self,
        parent: NodeId,
        range: &DateRange,
    ) -> Result<String, ServiceError> {
        let session = self.new_session().await?;
        let rollup = session.subtrees(&[parent], range).await?;
        let tree = session.tree();
        let rows: Vec<(String, NodeMetrics)> = rollup
            .children_of(tree, &parent)
            .into_iter()
            .map(|m| {
                let name = tree.get(&m.node_id).map(|n| n.name.clone()).unwrap_or_default();
                (name, m)
            })
            .collect();
        Ok(children_to_csv(&rows)?)
    }

    pub async fn hierarchy_root(
        &self,
        user: &CurrentUser,
        applied: DateRange,
    ) -> Result<HierarchyRoot, ServiceError> {
        self.hierarchy_root_at(user, applied, Utc::now()).await
    }

    pub async fn hierarchy_root_at(
        &self,
        user: &CurrentUser,
        applied: DateRange,
        now: DateTime<Utc>,
    ) -> Result<HierarchyRoot, ServiceError> {
        let ranges = self.period_ranges(applied, now)?;
        let session = self.new_session().await?;
        let root = compute_root(&session, user, &ranges).await?;
        info!(
            "Hierarchy root for {}: {} entities",
            user.role,
            root.root_entities.len()
        );
        Ok(root)
    }

    /// One drill-down level under `parent`.
    pub async fn hierarchy_children(
        &self,
        parent: NodeId,
        applied: DateRange,
    ) -> Result<Vec<HierarchyEntity>, ServiceError> {
        let ranges = self.period_ranges(applied, Utc::now())?;
        let session = self.new_session().await?;
        Ok(spawn_expand(session, parent, ranges).await??)
    }

    pub async fn period_summary(
        &self,
        scope: StatsScope,
        custom: Option<DateRange>,
    ) -> Result<PeriodSummary, ServiceError> {
        self.period_summary_at(scope, custom, Utc::now()).await
    }

    /// Today/week/month (and optional custom) figures for `scope`.
    ///
    /// At admin scope the figures are the unsplit totals of every top-level
    /// entity, and result counters over the applied range are included.
    pub async fn period_summary_at(
        &self,
        scope: StatsScope,
        custom: Option<DateRange>,
        now: DateTime<Utc>,
    ) -> Result<PeriodSummary, ServiceError> {
        let applied = match custom {
            Some(range) => range,
            None => self.resolver.resolve(Period::Today, None, now)?,
        };
        let fixed = self.period_ranges(applied, now)?;
        let mut ranges = vec![fixed.today, fixed.week, fixed.month];
        if custom.is_some() {
            ranges.push(fixed.custom);
        }

        let session = self.new_session().await?;
        let roots = match scope {
            StatsScope::Admin => session.tree().top_level(),
            StatsScope::Node(id) => vec![id],
        };

        let figures = try_join_all(ranges.iter().map(|range| async {
            let rollup = session.subtrees(&roots, range).await?;
            Ok::<Figures, ServiceError>(match scope {
                StatsScope::Admin => {
                    let base: BaseMetrics = roots
                        .iter()
                        .filter_map(|id| rollup.get(id).map(NodeMetrics::base))
                        .sum();
                    Figures::from_parts(base, split(base, Shares::none()))
                }
                StatsScope::Node(id) => rollup
                    .get(&id)
                    .map(Figures::from)
                    .ok_or(EngineError::UnknownNode(id))?,
            })
        }))
        .await?;

        let result_stats = match scope {
            StatsScope::Admin => Some(
                session
                    .engine()
                    .leaf()
                    .result_stats(&fixed.custom)
                    .await?,
            ),
            StatsScope::Node(_) => None,
        };

        Ok(PeriodSummary {
            node_id: match scope {
                StatsScope::Admin => None,
                StatsScope::Node(id) => Some(id),
            },
            today: figures[0],
            week: figures[1],
            month: figures[2],
            custom: figures.get(3).copied(),
            result_stats,
        })
    }

    /// Bet and winner counts for `scope` over `range`, with a per-lottery breakdown.
    pub async fn bets_stats(
        &self,
        scope: StatsScope,
        range: &DateRange,
    ) -> Result<BetsStats, ServiceError> {
        let session = self.new_session().await?;
        let tree = session.tree();

        let (taquillas, winner_scope) = match scope {
            StatsScope::Admin => {
                let all: Vec<NodeId> = tree
                    .roots()
                    .iter()
                    .flat_map(|root| tree.taquillas_under(root))
                    .collect();
                (all.clone(), WinnerScope::Taquillas(all))
            }
            StatsScope::Node(id) => {
                if !tree.contains(&id) {
                    return Err(EngineError::UnknownNode(id).into());
                }
                let under = tree.taquillas_under(&id);
                (under.clone(), WinnerScope::Taquillas(under))
            }
        };
        if taquillas.is_empty() {
            return Ok(BetsStats::tally(range, &[], &[]));
        }

        let bet_scope = TaquillaScope::Set(taquillas);
        let (bets, winners) = futures::try_join!(
            self.store.list_bets(&bet_scope, range),
            self.store.list_winners(&winner_scope, range),
        )?;
        Ok(BetsStats::tally(range, &bets, &winners))
    }
}
