//! PostgreSQL access: pool, calendar and punch repositories.

pub mod calendar;
pub mod connection;
pub mod punch;

pub use connection::{TableCounts, connect, server_version, table_counts};
