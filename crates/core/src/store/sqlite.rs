//! SQLite-backed price history.
//!
//! One row per `(token, network, date)`; the primary key makes concurrent
//! writers for the same day race harmlessly through `INSERT OR IGNORE`.

use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::NaiveDate;
use pricehistory_chain::Network;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use super::PriceStore;
use crate::{PricePoint, PriceSource, StoreError};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS price_history (
    token TEXT NOT NULL,
    network TEXT NOT NULL,
    date TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    price REAL NOT NULL,
    source TEXT NOT NULL,
    PRIMARY KEY (token, network, date)
)";

const COLUMNS: &str = "token, network, timestamp, price, source";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError(err.to_string())
    }
}

/// Durable price store in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    /// Open (creating if needed) the database at `url`, e.g.
    /// `sqlite://pricehistory.db`, and ensure the schema exists.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(url, "Price store opened");
        Ok(store)
    }

    /// Private in-memory database, for tests and throwaway runs.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // Each connection to :memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        order: &str,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        let sql = format!(
            "SELECT {} FROM price_history WHERE token = ? AND network = ? AND {} ORDER BY date {} LIMIT 1",
            COLUMNS, condition, order
        );
        let row = sqlx::query(&sql)
            .bind(token_key(token))
            .bind(network.as_str())
            .bind(date.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| point_from_row(&row)).transpose()
    }
}

fn token_key(token: Address) -> String {
    token.to_string().to_lowercase()
}

fn point_from_row(row: &SqliteRow) -> Result<PricePoint, StoreError> {
    let token: String = row.try_get("token")?;
    let network: String = row.try_get("network")?;
    let timestamp: i64 = row.try_get("timestamp")?;
    let price: f64 = row.try_get("price")?;
    let source: String = row.try_get("source")?;

    Ok(PricePoint {
        token: Address::from_str(&token)
            .map_err(|e| StoreError(format!("bad token '{}': {}", token, e)))?,
        network: network.parse().map_err(|e| StoreError(format!("{}", e)))?,
        timestamp: timestamp.max(0) as u64,
        price,
        source: source.parse().map_err(StoreError)?,
    })
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn find_exact(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        self.fetch_one_where("date = ?", "ASC", token, network, date)
            .await
    }

    async fn find_nearest_before(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        self.fetch_one_where("date <= ?", "DESC", token, network, date)
            .await
    }

    async fn find_nearest_after(
        &self,
        token: Address,
        network: Network,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>, StoreError> {
        self.fetch_one_where("date >= ?", "ASC", token, network, date)
            .await
    }

    async fn insert(&self, point: &PricePoint) -> Result<bool, StoreError> {
        let normalized = point.for_date();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO price_history (token, network, date, timestamp, price, source)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(token_key(normalized.token))
        .bind(normalized.network.as_str())
        .bind(normalized.date().to_string())
        .bind(normalized.timestamp as i64)
        .bind(normalized.price)
        .bind(normalized.source.as_str())
        .execute(&self.pool)
        .await?;

        let written = result.rows_affected() > 0;
        debug!(
            token = %normalized.token,
            date = %normalized.date(),
            written,
            "Stored price point"
        );
        Ok(written)
    }
}
