//! Domain types for the reseller network.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper and 0–100 `Percent` shares
//! - Typed ids for nodes, lotteries, bets and results
//! - The reseller node model and the raw facts (bets, daily results, winners)
//! - Computed per-node metrics and day-inclusive date ranges

pub mod decimal;
pub mod facts;
pub mod metrics;
pub mod node;
pub mod primitives;
pub mod range;

pub use decimal::Decimal;
pub use facts::{Bet, DailyResult, Prize, Winner};
pub use metrics::{BaseMetrics, NodeMetrics, ResultStats, Split};
pub use node::{NodeKind, ResellerNode};
pub use primitives::{BetId, LotteryId, NodeId, Percent, PercentError, ResultId};
pub use range::DateRange;
