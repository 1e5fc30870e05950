//! Storage seam shared by the scheduler pipeline and the HTTP handlers.
//!
//! `PgStore` forwards to the free functions in `db::queries`; tests swap in an
//! in-memory store.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use std::sync::Arc;

use crate::db::models::{Alert, DailySummary, NewDailySummary, NewReading, WeatherReading};
use crate::db::queries;

#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Insert unless a reading for the same (city, dt) exists. `true` if inserted.
    async fn store_if_absent(&self, reading: &NewReading) -> Result<bool, sqlx::Error>;

    async fn readings_between(
        &self,
        city: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error>;

    async fn latest_readings(
        &self,
        city: &str,
        limit: i64,
    ) -> Result<Vec<WeatherReading>, sqlx::Error>;

    async fn readings_since(
        &self,
        city: Option<&str>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error>;

    async fn upsert_daily_summary(
        &self,
        summary: &NewDailySummary,
    ) -> Result<DailySummary, sqlx::Error>;

    async fn daily_summaries(
        &self,
        city: Option<&str>,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, sqlx::Error>;

    async fn insert_alert(
        &self,
        city: &str,
        message: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Alert, sqlx::Error>;

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, sqlx::Error>;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;
}

pub type SharedStore = Arc<dyn WeatherStore>;

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherStore for PgStore {
    async fn store_if_absent(&self, reading: &NewReading) -> Result<bool, sqlx::Error> {
        queries::insert_reading_if_absent(&self.pool, reading).await
    }

    async fn readings_between(
        &self,
        city: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        queries::get_readings_between(&self.pool, city, start, end).await
    }

    async fn latest_readings(
        &self,
        city: &str,
        limit: i64,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        queries::get_latest_readings(&self.pool, city, limit).await
    }

    async fn readings_since(
        &self,
        city: Option<&str>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        queries::get_readings_since(&self.pool, city, cutoff).await
    }

    async fn upsert_daily_summary(
        &self,
        summary: &NewDailySummary,
    ) -> Result<DailySummary, sqlx::Error> {
        queries::upsert_daily_summary(&self.pool, summary).await
    }

    async fn daily_summaries(
        &self,
        city: Option<&str>,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, sqlx::Error> {
        queries::get_daily_summaries(&self.pool, city, since).await
    }

    async fn insert_alert(
        &self,
        city: &str,
        message: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Alert, sqlx::Error> {
        queries::insert_alert(&self.pool, city, message, timestamp).await
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
        queries::get_recent_alerts(&self.pool, limit).await
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
