//! Fact store abstraction: read-only access to bets, winners, daily results and
//! the reseller node list.

use crate::domain::{Bet, DailyResult, DateRange, LotteryId, NodeId, ResellerNode, Winner};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod rest;
pub mod sqlite;

pub use mock::MockFactStore;
pub use rest::RestFactStore;
pub use sqlite::SqliteFactStore;

/// Which taquillas a bets query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaquillaScope {
    One(NodeId),
    Set(Vec<NodeId>),
}

impl TaquillaScope {
    pub fn ids(&self) -> &[NodeId] {
        match self {
            TaquillaScope::One(id) => std::slice::from_ref(id),
            TaquillaScope::Set(ids) => ids,
        }
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids().contains(id)
    }
}

/// Which winners a winners query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinnerScope {
    Global,
    Lottery(LotteryId),
    Taquillas(Vec<NodeId>),
}

/// Read-only query contract of the fact store.
///
/// Implementations filter by calendar day: a fact is in `range` when
/// `range.contains(created_at)` (or, for results, `range.contains_day(result_date)`).
#[async_trait]
pub trait FactStore: Send + Sync + fmt::Debug {
    /// Bets placed at the scoped taquillas within `range`.
    async fn list_bets(
        &self,
        scope: &TaquillaScope,
        range: &DateRange,
    ) -> Result<Vec<Bet>, FactStoreError>;

    /// Winners within `range`, restricted by `scope`.
    async fn list_winners(
        &self,
        scope: &WinnerScope,
        range: &DateRange,
    ) -> Result<Vec<Winner>, FactStoreError>;

    /// Daily results whose `result_date` falls within `range`.
    async fn list_daily_results(&self, range: &DateRange)
        -> Result<Vec<DailyResult>, FactStoreError>;

    /// Every reseller node, in the store's natural order.
    async fn list_reseller_nodes(&self) -> Result<Vec<ResellerNode>, FactStoreError>;
}

/// Error type for fact store operations.
#[derive(Debug, Clone)]
pub enum FactStoreError {
    /// Network error (connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (429, 5xx, rejected request)
    HttpError { status: u16, message: String },
    /// Malformed row or response body
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    /// Local storage failure
    Storage(String),
    Other(String),
}

impl fmt::Display for FactStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactStoreError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            FactStoreError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            FactStoreError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            FactStoreError::RateLimited => write!(f, "Rate limited"),
            FactStoreError::Storage(msg) => write!(f, "Storage error: {}", msg),
            FactStoreError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for FactStoreError {}

impl From<sqlx::Error> for FactStoreError {
    fn from(err: sqlx::Error) -> Self {
        FactStoreError::Storage(err.to_string())
    }
}
