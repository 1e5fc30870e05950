//! Stored readings endpoint.
//!
//! GET /api/weather?city=<name>&duration=<1|6|12|24>

use axum::extract::{Query, State};
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::AppState;
use crate::db::models;
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{dec_to_f64, format_local, local_now};

/// Look-back window when `duration` is missing or not one of the known codes.
const DEFAULT_LOOKBACK_DAYS: i64 = 5;

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeatherQuery {
    /// City name; readings for all cities when omitted
    pub city: Option<String>,
    /// Look-back window in hours: "1", "6", "12" or "24". Anything else means 5 days.
    pub duration: Option<String>,
}

/// One stored reading.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadingResponse {
    pub id: Uuid,
    pub city: String,
    /// Weather category (e.g. "Clear", "Haze")
    pub main: String,
    /// Temperature in Celsius
    pub temp: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Relative humidity percentage
    pub humidity: i32,
    /// Wind speed in metres per second
    pub wind_speed: f64,
    /// Observation time, local, "YYYY-MM-DD HH:MM:SS"
    pub dt: String,
}

impl From<models::WeatherReading> for ReadingResponse {
    fn from(r: models::WeatherReading) -> Self {
        Self {
            id: r.id,
            city: r.city,
            main: r.main,
            temp: dec_to_f64(r.temp),
            feels_like: dec_to_f64(r.feels_like),
            humidity: r.humidity,
            wind_speed: dec_to_f64(r.wind_speed),
            dt: format_local(r.dt),
        }
    }
}

/// Map a duration code to its look-back window.
pub fn lookback(duration: Option<&str>) -> Duration {
    match duration.map(str::trim) {
        Some("1") => Duration::hours(1),
        Some("6") => Duration::hours(6),
        Some("12") => Duration::hours(12),
        Some("24") => Duration::hours(24),
        _ => Duration::days(DEFAULT_LOOKBACK_DAYS),
    }
}

/// List stored readings within a recent window, oldest first.
#[utoipa::path(
    get,
    path = "/api/weather",
    tag = "Weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Readings within the window, ascending by observation time", body = Vec<ReadingResponse>),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<Vec<ReadingResponse>>, AppError> {
    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let cutoff = local_now() - lookback(params.duration.as_deref());

    let readings = state.store.readings_since(city, cutoff).await?;
    Ok(Json(
        readings.into_iter().map(ReadingResponse::from).collect(),
    ))
}
