pub mod api;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{FactStore, FactStoreError, MockFactStore, RestFactStore, SqliteFactStore};
pub use db::{init_db, Repository};
pub use domain::{
    Bet, DailyResult, DateRange, Decimal, NodeId, NodeKind, NodeMetrics, Percent, ResellerNode,
    Winner,
};
pub use engine::{EngineError, PeriodResolver};
pub use error::AppError;
pub use orchestration::StatsService;
