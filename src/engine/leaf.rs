//! Leaf aggregation: raw bets and winners of taquillas reduced to gross figures.

use crate::datasource::{FactStore, FactStoreError, TaquillaScope, WinnerScope};
use crate::domain::{BaseMetrics, Bet, DateRange, NodeId, ResultStats, Winner};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reduces fact streams per taquilla.
#[derive(Debug, Clone)]
pub struct LeafAggregator {
    store: Arc<dyn FactStore>,
}

impl LeafAggregator {
    pub fn new(store: Arc<dyn FactStore>) -> Self {
        Self { store }
    }

    /// Gross figures of one taquilla. No facts means zeros, not an error.
    pub async fn aggregate(
        &self,
        taquilla: NodeId,
        range: &DateRange,
    ) -> Result<BaseMetrics, FactStoreError> {
        let mut by_taquilla = self.aggregate_many(&[taquilla], range).await?;
        Ok(by_taquilla.remove(&taquilla).unwrap_or_default())
    }

    /// Gross figures for every taquilla in `taquillas`, fetched in one batch per stream.
    ///
    /// Bets and winners are fetched concurrently; if either fetch fails the whole
    /// aggregation fails rather than reporting partial figures.
    pub async fn aggregate_many(
        &self,
        taquillas: &[NodeId],
        range: &DateRange,
    ) -> Result<HashMap<NodeId, BaseMetrics>, FactStoreError> {
        if taquillas.is_empty() {
            return Ok(HashMap::new());
        }

        let bet_scope = TaquillaScope::Set(taquillas.to_vec());
        let winner_scope = WinnerScope::Taquillas(taquillas.to_vec());
        let (bets, winners) = futures::try_join!(
            self.store.list_bets(&bet_scope, range),
            self.store.list_winners(&winner_scope, range),
        )?;
        debug!(
            "Aggregating {} bets and {} winners over {} taquillas",
            bets.len(),
            winners.len(),
            taquillas.len()
        );

        Ok(fold_facts(taquillas, &bets, &winners, range))
    }

    /// Lottery-level counters: results posted in range and how many paid out.
    pub async fn result_stats(&self, range: &DateRange) -> Result<ResultStats, FactStoreError> {
        let results = self.store.list_daily_results(range).await?;
        Ok(ResultStats {
            result_count: results.len() as u64,
            results_with_winners_count: results.iter().filter(|r| r.has_winners()).count() as u64,
        })
    }
}

/// Sum bet amounts into `sales` and winner payouts into `prizes`, per taquilla.
///
/// Every requested taquilla gets an entry. Facts for taquillas outside the
/// request or outside `range` are dropped.
pub fn fold_facts(
    taquillas: &[NodeId],
    bets: &[Bet],
    winners: &[Winner],
    range: &DateRange,
) -> HashMap<NodeId, BaseMetrics> {
    let mut out: HashMap<NodeId, BaseMetrics> =
        taquillas.iter().map(|id| (*id, BaseMetrics::zero())).collect();

    let mut stray = 0usize;
    for bet in bets.iter().filter(|b| range.contains(&b.created_at)) {
        match out.get_mut(&bet.taquilla_id) {
            Some(m) => m.sales += bet.amount,
            None => stray += 1,
        }
    }
    for winner in winners.iter().filter(|w| range.contains(&w.created_at)) {
        match out.get_mut(&winner.taquilla_id) {
            Some(m) => m.prizes += winner.potential_win,
            None => stray += 1,
        }
    }
    if stray > 0 {
        warn!("Dropped {} facts for taquillas outside the requested set", stray);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::mock::{FactStream, MockFactStore};
    use crate::domain::{BetId, Decimal, LotteryId};
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn range() -> DateRange {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        DateRange::days(FixedOffset::east_opt(0).unwrap(), d, d)
    }

    fn bet(taquilla: NodeId, amount: i64, day: u32) -> Bet {
        Bet {
            id: BetId::random(),
            taquilla_id: taquilla,
            lottery_id: LotteryId::random(),
            animal_number: "3".to_string(),
            amount: Decimal::from(amount),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
        }
    }

    fn winner(taquilla: NodeId, payout: i64) -> Winner {
        Winner {
            bet_id: BetId::random(),
            taquilla_id: taquilla,
            lottery_id: LotteryId::random(),
            amount: Decimal::from(10),
            potential_win: Decimal::from(payout),
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 18, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_two_bets_one_winner() {
        let a = NodeId::random();
        let store = MockFactStore::new()
            .with_bet(bet(a, 60, 5))
            .with_bet(bet(a, 40, 5))
            .with_bet(bet(a, 999, 6))
            .with_winner(winner(a, 300));
        let agg = LeafAggregator::new(Arc::new(store));

        let m = agg.aggregate(a, &range()).await.unwrap();
        assert_eq!(m.sales, Decimal::from(100));
        assert_eq!(m.prizes, Decimal::from(300));
    }

    #[tokio::test]
    async fn test_no_facts_is_all_zero() {
        let agg = LeafAggregator::new(Arc::new(MockFactStore::new()));
        let m = agg.aggregate(NodeId::random(), &range()).await.unwrap();
        assert!(m.is_zero());
    }

    #[tokio::test]
    async fn test_winners_failure_is_not_silent_zero() {
        let a = NodeId::random();
        let store = MockFactStore::new()
            .with_bet(bet(a, 60, 5))
            .failing(
                FactStream::Winners,
                FactStoreError::NetworkError("reset".to_string()),
            );
        let agg = LeafAggregator::new(Arc::new(store));
        assert!(agg.aggregate(a, &range()).await.is_err());
    }

    #[test]
    fn test_fold_keeps_taquillas_apart() {
        let a = NodeId::random();
        let b = NodeId::random();
        let outsider = NodeId::random();
        let bets = vec![bet(a, 100, 5), bet(b, 200, 5), bet(outsider, 50, 5)];
        let out = fold_facts(&[a, b], &bets, &[winner(b, 30)], &range());
        assert_eq!(out.len(), 2);
        assert_eq!(out[&a].sales, Decimal::from(100));
        assert_eq!(out[&b].sales, Decimal::from(200));
        assert_eq!(out[&b].prizes, Decimal::from(30));
    }

    #[tokio::test]
    async fn test_result_stats() {
        use crate::domain::{DailyResult, Prize, ResultId};
        let result = |to_pay: i64| DailyResult {
            id: ResultId::random(),
            lottery_id: LotteryId::random(),
            result_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            prize: Prize {
                animal_number: "1".to_string(),
                animal_name: "Carnero".to_string(),
                multiplier: Decimal::from(30),
            },
            total_to_pay: Decimal::from(to_pay),
            total_raised: Decimal::zero(),
        };
        let store = MockFactStore::new()
            .with_result(result(0))
            .with_result(result(300))
            .with_result(result(60));
        let agg = LeafAggregator::new(Arc::new(store));
        let stats = agg.result_stats(&range()).await.unwrap();
        assert_eq!(stats.result_count, 3);
        assert_eq!(stats.results_with_winners_count, 2);
    }
}
