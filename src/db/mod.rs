//! SQLite fact database.
//!
//! This module provides:
//! - Database initialization, schema and pragma configuration
//! - Repository layer: fact inserts for the result-posting producer and the
//!   range queries behind the SQLite fact store

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
