//! On-demand forecast endpoint.
//!
//! GET /api/forecast?city=<name> proxies the provider's multi-day forecast.
//! Nothing is stored.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::format_local;
use crate::services::openweather::ForecastPoint;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ForecastQuery {
    /// City name (required)
    pub city: Option<String>,
}

/// One forecast step.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForecastPointResponse {
    /// Forecast time, local, "YYYY-MM-DD HH:MM:SS"
    pub dt: String,
    /// Temperature in Celsius
    pub temp: f64,
    /// Feels-like temperature in Celsius
    pub feels_like: f64,
    /// Relative humidity percentage
    pub humidity: i32,
    /// Wind speed in metres per second
    pub wind_speed: f64,
    /// Weather description (e.g. "scattered clouds")
    pub weather: String,
}

impl From<ForecastPoint> for ForecastPointResponse {
    fn from(p: ForecastPoint) -> Self {
        Self {
            dt: format_local(p.observed_at),
            temp: p.temperature,
            feels_like: p.feels_like,
            humidity: p.humidity,
            wind_speed: p.wind_speed,
            weather: p.description,
        }
    }
}

/// Get the provider's multi-day forecast for a city.
#[utoipa::path(
    get,
    path = "/api/forecast",
    tag = "Forecast",
    params(ForecastQuery),
    responses(
        (status = 200, description = "Forecast points in provider order", body = Vec<ForecastPointResponse>),
        (status = 400, description = "Missing city parameter", body = ErrorResponse),
        (status = 500, description = "Provider request failed", body = ErrorResponse),
    )
)]
pub async fn get_forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastQuery>,
) -> Result<Json<Vec<ForecastPointResponse>>, AppError> {
    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("City parameter is required".to_string()))?;

    let points = state.provider.fetch_forecast(city).await.map_err(|e| {
        tracing::warn!("Failed to fetch forecast for {}: {}", city, e);
        AppError::ExternalServiceError("Unable to fetch forecast data".to_string())
    })?;

    Ok(Json(
        points.into_iter().map(ForecastPointResponse::from).collect(),
    ))
}
