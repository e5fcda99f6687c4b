//! Computed (never persisted) per-node figures.

use super::{Decimal, NodeId, NodeKind};
use serde::{Deserialize, Serialize};

/// Gross figures before any commission split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseMetrics {
    pub sales: Decimal,
    pub prizes: Decimal,
}

impl BaseMetrics {
    pub fn new(sales: Decimal, prizes: Decimal) -> Self {
        Self { sales, prizes }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.sales.is_zero() && self.prizes.is_zero()
    }
}

impl std::ops::Add for BaseMetrics {
    type Output = BaseMetrics;

    fn add(self, rhs: BaseMetrics) -> BaseMetrics {
        BaseMetrics {
            sales: self.sales + rhs.sales,
            prizes: self.prizes + rhs.prizes,
        }
    }
}

impl std::ops::AddAssign for BaseMetrics {
    fn add_assign(&mut self, rhs: BaseMetrics) {
        self.sales += rhs.sales;
        self.prizes += rhs.prizes;
    }
}

impl std::iter::Sum for BaseMetrics {
    fn sum<I: Iterator<Item = BaseMetrics>>(iter: I) -> BaseMetrics {
        iter.fold(BaseMetrics::zero(), |acc, m| acc + m)
    }
}

/// Output of the commission split for one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub commission: Decimal,
    /// `sales - prizes - commission`; negative on a losing period.
    pub balance: Decimal,
    pub profit: Decimal,
    /// Informational cut of a positive balance per `shareOnProfits`.
    pub profit_share: Decimal,
}

/// Rolled-up figures of one node for one date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetrics {
    pub node_id: NodeId,
    pub kind: NodeKind,
    pub sales: Decimal,
    pub prizes: Decimal,
    pub commission: Decimal,
    pub balance: Decimal,
    pub profit: Decimal,
    pub profit_share: Decimal,
}

impl NodeMetrics {
    pub fn from_parts(node_id: NodeId, kind: NodeKind, base: BaseMetrics, split: Split) -> Self {
        Self {
            node_id,
            kind,
            sales: base.sales,
            prizes: base.prizes,
            commission: split.commission,
            balance: split.balance,
            profit: split.profit,
            profit_share: split.profit_share,
        }
    }

    pub fn base(&self) -> BaseMetrics {
        BaseMetrics::new(self.sales, self.prizes)
    }
}

/// Lottery-level counters, only meaningful at admin scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub result_count: u64,
    pub results_with_winners_count: u64,
}
