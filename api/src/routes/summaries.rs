//! GET /api/summaries?city=<name>&days=<n>: stored daily summaries, newest day first.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use crate::db::models;
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{dec_to_f64, local_now};

const DEFAULT_SUMMARY_DAYS: i64 = 7;
const MAX_SUMMARY_DAYS: i64 = 90;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SummaryQuery {
    /// City name; all cities when omitted
    pub city: Option<String>,
    /// How many past days to include (1-90, default 7)
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DailySummaryResponse {
    pub city: String,
    /// Calendar day (local), "YYYY-MM-DD"
    pub date: String,
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    /// Most frequent weather category that day; null when none was reported
    pub dominant_condition: Option<String>,
}

impl From<models::DailySummary> for DailySummaryResponse {
    fn from(s: models::DailySummary) -> Self {
        Self {
            city: s.city,
            date: s.date.format("%Y-%m-%d").to_string(),
            avg_temp: dec_to_f64(s.avg_temp),
            max_temp: dec_to_f64(s.max_temp),
            min_temp: dec_to_f64(s.min_temp),
            dominant_condition: s.dominant_condition,
        }
    }
}

/// List daily summaries for the last `days` days.
#[utoipa::path(
    get,
    path = "/api/summaries",
    tag = "Summaries",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Daily summaries, newest day first", body = Vec<DailySummaryResponse>),
        (status = 400, description = "Invalid days parameter", body = ErrorResponse),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_summaries(
    State(state): State<AppState>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<Vec<DailySummaryResponse>>, AppError> {
    let days = params.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
    if !(1..=MAX_SUMMARY_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {}",
            MAX_SUMMARY_DAYS
        )));
    }

    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let since = (local_now() - Duration::days(days)).date();

    let summaries = state.store.daily_summaries(city, since).await?;
    Ok(Json(
        summaries
            .into_iter()
            .map(DailySummaryResponse::from)
            .collect(),
    ))
}
