//! Connection pool setup and startup diagnostics.

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, Statement,
};
use std::time::Duration;
use tracing::log::LevelFilter;

use crate::config::DatabaseConfig;
use crate::entities::prelude::*;

/// Open the PostgreSQL pool.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.connection_string());
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt).await
}

/// Server version string, e.g. `PostgreSQL 16.2 ...`.
pub async fn server_version(db: &DatabaseConnection) -> Result<String, DbErr> {
    let row = db
        .query_one(Statement::from_string(
            DatabaseBackend::Postgres,
            "SELECT version()".to_owned(),
        ))
        .await?;

    match row {
        Some(row) => row.try_get("", "version"),
        None => Ok("Unknown".to_owned()),
    }
}

/// Row counts of the report tables.
#[derive(Debug, Clone, Copy)]
pub struct TableCounts {
    pub calendar_days: u64,
    pub punch_records: u64,
}

pub async fn table_counts(db: &DatabaseConnection) -> Result<TableCounts, DbErr> {
    Ok(TableCounts {
        calendar_days: Calendars::find().count(db).await?,
        punch_records: Records::find().count(db).await?,
    })
}
