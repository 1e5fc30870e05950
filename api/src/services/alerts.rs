//! Consecutive-reading heat alerts.
//!
//! A city is alerted when its two most recently observed readings are both
//! strictly above [`ALERT_THRESHOLD_C`]. There is no suppression window: every
//! run in which the condition holds appends another alert.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::db::models::WeatherReading;
use crate::services::store::WeatherStore;

/// Temperature (°C) both latest readings must exceed.
pub const ALERT_THRESHOLD_C: i64 = 35;

/// How many of the latest readings are inspected.
const CONSECUTIVE_READINGS: i64 = 2;

pub const ALERT_MESSAGE: &str = "Temperature exceeded 35°C for two consecutive updates";

/// Whether `latest` holds exactly the required number of readings, all above the threshold.
pub fn is_sustained_heat(latest: &[WeatherReading]) -> bool {
    let threshold = Decimal::from(ALERT_THRESHOLD_C);
    latest.len() == CONSECUTIVE_READINGS as usize && latest.iter().all(|r| r.temp > threshold)
}

/// Inspect every city and append an alert where the heat condition holds.
///
/// Store failures are logged per city. Returns the number of alerts inserted.
pub async fn detect_alerts(
    store: &dyn WeatherStore,
    cities: &[String],
    now: NaiveDateTime,
) -> usize {
    let mut raised = 0;

    for city in cities {
        let latest = match store.latest_readings(city, CONSECUTIVE_READINGS).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Alerts: failed to load latest readings for {}: {}", city, e);
                continue;
            }
        };

        if !is_sustained_heat(&latest) {
            continue;
        }

        match store.insert_alert(city, ALERT_MESSAGE, now).await {
            Ok(alert) => {
                raised += 1;
                tracing::warn!("Alerts: {}: {} (alert {})", city, ALERT_MESSAGE, alert.id);
            }
            Err(e) => {
                tracing::error!("Alerts: failed to insert alert for {}: {}", city, e);
            }
        }
    }

    raised
}
