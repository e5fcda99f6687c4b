//! Repository layer for the fact database.
//!
//! Methods are split across submodules by domain:
//! - `nodes.rs` - reseller node operations
//! - `facts.rs` - bets, winners and daily results
//!
//! Money is stored as canonical decimal TEXT and timestamps as UTC milliseconds.

mod facts;
mod nodes;

use crate::domain::Decimal;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

/// SQLite has a 999 parameter limit; IN lists are chunked well below it.
const IN_CHUNK_SIZE: usize = 500;

/// Repository for fact database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

/// Unparsable stored values are a decode error, never a silent zero.
fn decode<T, E>(column: &str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = E>,
    E: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| {
        sqlx::Error::Decode(format!("invalid {} value {:?}: {}", column, raw, e).into())
    })
}

fn decode_money(column: &str, raw: &str) -> Result<Decimal, sqlx::Error> {
    decode::<Decimal, _>(column, raw)
}

fn decode_time(column: &str, ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or_else(|| {
        sqlx::Error::Decode(format!("invalid {} timestamp {}", column, ms).into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }

    #[test]
    fn test_decode_money_rejects_garbage() {
        assert_eq!(decode_money("amount", "12.50").unwrap(), Decimal::from_str("12.5").unwrap());
        assert!(matches!(
            decode_money("amount", "twelve"),
            Err(sqlx::Error::Decode(_))
        ));
    }

    #[test]
    fn test_decode_time() {
        let t = decode_time("created_at_ms", 1_709_640_000_000).unwrap();
        assert_eq!(t.timestamp_millis(), 1_709_640_000_000);
    }
}
