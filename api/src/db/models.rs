use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// One stored observation for a city (`weather_data` row). Never updated.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WeatherReading {
    pub id: Uuid,
    pub city: String,
    /// Provider's weather category (e.g. "Clear", "Rain").
    pub main: String,
    pub temp: Decimal,
    pub feels_like: Decimal,
    pub humidity: i32,
    pub wind_speed: Decimal,
    /// Observation time, naive local. Unique together with `city`.
    pub dt: NaiveDateTime,
}

/// A reading as produced by the provider, before it has a row id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub city: String,
    pub main: String,
    pub temp: Decimal,
    pub feels_like: Decimal,
    pub humidity: i32,
    pub wind_speed: Decimal,
    pub dt: NaiveDateTime,
}

/// Per-city, per-day temperature aggregate.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DailySummary {
    pub id: Uuid,
    pub city: String,
    pub date: NaiveDate,
    pub avg_temp: Decimal,
    pub max_temp: Decimal,
    pub min_temp: Decimal,
    pub dominant_condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDailySummary {
    pub city: String,
    pub date: NaiveDate,
    pub avg_temp: Decimal,
    pub max_temp: Decimal,
    pub min_temp: Decimal,
    pub dominant_condition: Option<String>,
}

/// Heat alert raised by the detector (`alerts` row). Append-only.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub city: String,
    pub message: String,
    pub timestamp: NaiveDateTime,
}
