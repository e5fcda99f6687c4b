//! Request orchestration: fact store to tree to rollup, one snapshot per call.

pub mod report;
pub mod stats;

pub use report::{BetsStats, Figures, LotteryBets, PeriodSummary, StatsScope};
pub use stats::{ServiceError, StatsService};
