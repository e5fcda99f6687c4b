//! Commission split of a node's rolled-up gross figures.

use crate::domain::{BaseMetrics, Percent, ResellerNode, Split};

/// A node's contractual shares. Missing shares take no cut.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shares {
    pub on_sales: Option<Percent>,
    pub on_profits: Option<Percent>,
}

impl Shares {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn of(node: &ResellerNode) -> Self {
        Self {
            on_sales: node.share_on_sales,
            on_profits: node.share_on_profits,
        }
    }
}

/// Split gross `base` with `shares`.
///
/// Always applied to the gross totals of the subtree, never to a child's
/// already-split figures, so cuts at different levels do not compound.
pub fn split(base: BaseMetrics, shares: Shares) -> Split {
    let commission = shares
        .on_sales
        .map(|p| p.of(base.sales))
        .unwrap_or_default();
    let balance = base.sales - base.prizes - commission;
    let profit_share = shares
        .on_profits
        .map(|p| p.of(balance.max_zero()))
        .unwrap_or_default();

    Split {
        commission,
        balance,
        profit: balance,
        profit_share,
    }
}
