//! Fact store backed by the local SQLite fact database.

use super::{FactStore, FactStoreError, TaquillaScope, WinnerScope};
use crate::db::Repository;
use crate::domain::{Bet, DailyResult, DateRange, ResellerNode, Winner};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SqliteFactStore {
    repo: Arc<Repository>,
}

impl SqliteFactStore {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl FactStore for SqliteFactStore {
    async fn list_bets(
        &self,
        scope: &TaquillaScope,
        range: &DateRange,
    ) -> Result<Vec<Bet>, FactStoreError> {
        let (start, end) = range.utc_bounds();
        debug!(
            "Listing bets for {} taquillas in [{}, {})",
            scope.ids().len(),
            start,
            end
        );
        Ok(self.repo.query_bets(scope.ids(), start, end).await?)
    }

    async fn list_winners(
        &self,
        scope: &WinnerScope,
        range: &DateRange,
    ) -> Result<Vec<Winner>, FactStoreError> {
        let (start, end) = range.utc_bounds();
        let winners = match scope {
            WinnerScope::Global => self.repo.query_winners(None, None, start, end).await?,
            WinnerScope::Lottery(id) => self.repo.query_winners(Some(*id), None, start, end).await?,
            WinnerScope::Taquillas(ids) => {
                self.repo
                    .query_winners(None, Some(ids.as_slice()), start, end)
                    .await?
            }
        };
        Ok(winners)
    }

    async fn list_daily_results(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DailyResult>, FactStoreError> {
        Ok(self
            .repo
            .query_daily_results(range.first_day(), range.last_day())
            .await?)
    }

    async fn list_reseller_nodes(&self) -> Result<Vec<ResellerNode>, FactStoreError> {
        Ok(self.repo.list_nodes().await?)
    }
}
