//! In-memory fact store for tests and demos.

use super::{FactStore, FactStoreError, TaquillaScope, WinnerScope};
use crate::domain::{Bet, DailyResult, DateRange, ResellerNode, Winner};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Which query a configured failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactStream {
    Bets,
    Winners,
    DailyResults,
    Nodes,
}

/// Mock fact store that serves predefined data.
#[derive(Debug, Clone, Default)]
pub struct MockFactStore {
    nodes: Vec<ResellerNode>,
    bets: Vec<Bet>,
    winners: Vec<Winner>,
    results: Vec<DailyResult>,
    failures: Vec<(FactStream, FactStoreError)>,
    delays: Vec<(FactStream, Duration)>,
    calls: Arc<CallCounts>,
}

/// Number of queries served per stream, shared between clones.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub bets: AtomicUsize,
    pub winners: AtomicUsize,
    pub daily_results: AtomicUsize,
    pub nodes: AtomicUsize,
    /// Queries that got past their configured delay.
    pub released: AtomicUsize,
}

impl MockFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: ResellerNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<ResellerNode>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn with_bet(mut self, bet: Bet) -> Self {
        self.bets.push(bet);
        self
    }

    pub fn with_bets(mut self, bets: Vec<Bet>) -> Self {
        self.bets.extend(bets);
        self
    }

    pub fn with_winner(mut self, winner: Winner) -> Self {
        self.winners.push(winner);
        self
    }

    pub fn with_result(mut self, result: DailyResult) -> Self {
        self.results.push(result);
        self
    }

    /// Make every query on `stream` fail with `error`.
    pub fn failing(mut self, stream: FactStream, error: FactStoreError) -> Self {
        self.failures.push((stream, error));
        self
    }

    /// Hold every query on `stream` for `delay` before answering.
    pub fn delayed(mut self, stream: FactStream, delay: Duration) -> Self {
        self.delays.push((stream, delay));
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    async fn check(&self, stream: FactStream) -> Result<(), FactStoreError> {
        if let Some((_, delay)) = self.delays.iter().find(|(s, _)| *s == stream) {
            tokio::time::sleep(*delay).await;
            self.calls.released.fetch_add(1, Ordering::SeqCst);
        }
        match self.failures.iter().find(|(s, _)| *s == stream) {
            Some((_, err)) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl FactStore for MockFactStore {
    async fn list_bets(
        &self,
        scope: &TaquillaScope,
        range: &DateRange,
    ) -> Result<Vec<Bet>, FactStoreError> {
        self.calls.bets.fetch_add(1, Ordering::Relaxed);
        self.check(FactStream::Bets).await?;
        Ok(self
            .bets
            .iter()
            .filter(|b| scope.contains(&b.taquilla_id) && range.contains(&b.created_at))
            .cloned()
            .collect())
    }

    async fn list_winners(
        &self,
        scope: &WinnerScope,
        range: &DateRange,
    ) -> Result<Vec<Winner>, FactStoreError> {
        self.calls.winners.fetch_add(1, Ordering::Relaxed);
        self.check(FactStream::Winners).await?;
        Ok(self
            .winners
            .iter()
            .filter(|w| {
                let in_scope = match scope {
                    WinnerScope::Global => true,
                    WinnerScope::Lottery(id) => w.lottery_id == *id,
                    WinnerScope::Taquillas(ids) => ids.contains(&w.taquilla_id),
                };
                in_scope && range.contains(&w.created_at)
            })
            .cloned()
            .collect())
    }

    async fn list_daily_results(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DailyResult>, FactStoreError> {
        self.calls.daily_results.fetch_add(1, Ordering::Relaxed);
        self.check(FactStream::DailyResults).await?;
        Ok(self
            .results
            .iter()
            .filter(|r| range.contains_day(r.result_date))
            .cloned()
            .collect())
    }

    async fn list_reseller_nodes(&self) -> Result<Vec<ResellerNode>, FactStoreError> {
        self.calls.nodes.fetch_add(1, Ordering::Relaxed);
        self.check(FactStream::Nodes).await?;
        Ok(self.nodes.clone())
    }
}
