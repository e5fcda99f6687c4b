//! Raw facts produced by the sales and result-posting workflows.
//!
//! All three are append-only: nothing in this crate mutates them.

use super::{BetId, Decimal, LotteryId, NodeId, ResultId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A wager placed at a taquilla.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: BetId,
    pub taquilla_id: NodeId,
    pub lottery_id: LotteryId,
    pub animal_number: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Winning animal of a lottery draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub animal_number: String,
    pub animal_name: String,
    pub multiplier: Decimal,
}

/// The closing of one lottery for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyResult {
    pub id: ResultId,
    pub lottery_id: LotteryId,
    pub result_date: NaiveDate,
    pub prize: Prize,
    /// Sum of payouts for the bets that matched this result.
    pub total_to_pay: Decimal,
    /// Sales minus payout minus commission for this lottery-day.
    pub total_raised: Decimal,
}

impl DailyResult {
    pub fn has_winners(&self) -> bool {
        self.total_to_pay.is_positive()
    }
}

/// A bet that matched a posted result.
///
/// No paid/pending settlement state is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub bet_id: BetId,
    pub taquilla_id: NodeId,
    pub lottery_id: LotteryId,
    pub amount: Decimal,
    /// `amount × multiplier` of the matching prize.
    pub potential_win: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Winner {
    /// Derive the winner fact for `bet` against `result`, if the bet matched.
    pub fn from_match(bet: &Bet, result: &DailyResult) -> Option<Self> {
        if bet.lottery_id != result.lottery_id || bet.animal_number != result.prize.animal_number
        {
            return None;
        }
        Some(Self {
            bet_id: bet.id,
            taquilla_id: bet.taquilla_id,
            lottery_id: bet.lottery_id,
            amount: bet.amount,
            potential_win: bet.amount * result.prize.multiplier,
            created_at: bet.created_at,
        })
    }
}
