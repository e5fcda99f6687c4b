//! Response shapes for the summary and bets reports, plus CSV export.

use crate::domain::{
    BaseMetrics, Bet, DateRange, Decimal, LotteryId, NodeId, NodeMetrics, ResultStats, Split,
    Winner,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics without node identity, for scope totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Figures {
    pub sales: Decimal,
    pub prizes: Decimal,
    pub commission: Decimal,
    pub balance: Decimal,
    pub profit: Decimal,
    pub profit_share: Decimal,
}

impl Figures {
    pub fn from_parts(base: BaseMetrics, split: Split) -> Self {
        Self {
            sales: base.sales,
            prizes: base.prizes,
            commission: split.commission,
            balance: split.balance,
            profit: split.profit,
            profit_share: split.profit_share,
        }
    }
}

impl From<&NodeMetrics> for Figures {
    fn from(m: &NodeMetrics) -> Self {
        Self {
            sales: m.sales,
            prizes: m.prizes,
            commission: m.commission,
            balance: m.balance,
            profit: m.profit,
            profit_share: m.profit_share,
        }
    }
}

/// Who a summary or bets report is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    Admin,
    Node(NodeId),
}

/// Today/week/month figures for one scope, plus the applied custom range if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub today: Figures,
    pub week: Figures,
    pub month: Figures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<Figures>,
    /// Lottery-level counters over the applied range; admin scope only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_stats: Option<ResultStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotteryBets {
    pub lottery_id: LotteryId,
    pub bet_count: u64,
    pub total_wagered: Decimal,
    pub winner_count: u64,
    pub total_potential_payout: Decimal,
}

impl LotteryBets {
    fn empty(lottery_id: LotteryId) -> Self {
        Self {
            lottery_id,
            bet_count: 0,
            total_wagered: Decimal::zero(),
            winner_count: 0,
            total_potential_payout: Decimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetsStats {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
    pub bet_count: u64,
    pub total_wagered: Decimal,
    pub winner_count: u64,
    pub total_potential_payout: Decimal,
    /// Sorted by lottery id.
    pub by_lottery: Vec<LotteryBets>,
}

impl BetsStats {
    /// Tally bets and winners inside `range`, overall and per lottery.
    pub fn tally(range: &DateRange, bets: &[Bet], winners: &[Winner]) -> Self {
        let mut by_lottery: BTreeMap<LotteryId, LotteryBets> = BTreeMap::new();

        for bet in bets.iter().filter(|b| range.contains(&b.created_at)) {
            let entry = by_lottery
                .entry(bet.lottery_id)
                .or_insert_with(|| LotteryBets::empty(bet.lottery_id));
            entry.bet_count += 1;
            entry.total_wagered += bet.amount;
        }
        for winner in winners.iter().filter(|w| range.contains(&w.created_at)) {
            let entry = by_lottery
                .entry(winner.lottery_id)
                .or_insert_with(|| LotteryBets::empty(winner.lottery_id));
            entry.winner_count += 1;
            entry.total_potential_payout += winner.potential_win;
        }

        let by_lottery: Vec<LotteryBets> = by_lottery.into_values().collect();
        Self {
            from: range.first_day(),
            to: range.last_day(),
            bet_count: by_lottery.iter().map(|l| l.bet_count).sum(),
            total_wagered: by_lottery.iter().map(|l| l.total_wagered).sum(),
            winner_count: by_lottery.iter().map(|l| l.winner_count).sum(),
            total_potential_payout: by_lottery.iter().map(|l| l.total_potential_payout).sum(),
            by_lottery,
        }
    }
}

/// One CSV row per child; names come from the tree, figures as canonical decimals.
pub fn children_to_csv(rows: &[(String, NodeMetrics)]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "node_id",
        "kind",
        "name",
        "sales",
        "prizes",
        "commission",
        "balance",
        "profit",
        "profit_share",
    ])?;
    for (name, m) in rows {
        writer.write_record([
            m.node_id.to_string(),
            m.kind.to_string(),
            name.clone(),
            m.sales.to_canonical_string(),
            m.prizes.to_canonical_string(),
            m.commission.to_canonical_string(),
            m.balance.to_canonical_string(),
            m.profit.to_canonical_string(),
            m.profit_share.to_canonical_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
