//! GET /api/alerts: most recent heat alerts, newest first.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::AppState;
use crate::db::models;
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::format_local;

/// Maximum number of alerts returned.
const ALERTS_LIMIT: i64 = 100;

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertResponse {
    pub id: Uuid,
    pub city: String,
    pub message: String,
    /// When the alert was raised, local, "YYYY-MM-DD HH:MM:SS"
    pub timestamp: String,
}

impl From<models::Alert> for AlertResponse {
    fn from(a: models::Alert) -> Self {
        Self {
            id: a.id,
            city: a.city,
            message: a.message,
            timestamp: format_local(a.timestamp),
        }
    }
}

/// List the 100 most recent alerts.
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "Up to 100 alerts, newest first", body = Vec<AlertResponse>),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn get_alerts(
    State(state): State<AppState>,
) -> Result<Json<Vec<AlertResponse>>, AppError> {
    let alerts = state.store.recent_alerts(ALERTS_LIMIT).await?;
    tracing::debug!("Fetched {} alerts", alerts.len());
    Ok(Json(alerts.into_iter().map(AlertResponse::from).collect()))
}
