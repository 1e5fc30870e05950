//! Daily summary aggregation.
//!
//! For each monitored city, summarises the previous local calendar day's
//! readings into average/max/min temperature and the dominant condition.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::db::models::{NewDailySummary, WeatherReading};
use crate::services::store::WeatherStore;

/// Temperature aggregate over one window of readings.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSummary {
    pub avg_temp: Decimal,
    pub max_temp: Decimal,
    pub min_temp: Decimal,
    pub dominant_condition: Option<String>,
}

/// The day before `now` and its inclusive bounds
/// `[00:00:00, 23:59:59.999999]`.
pub fn yesterday_window(now: NaiveDateTime) -> (NaiveDate, NaiveDateTime, NaiveDateTime) {
    let date = (now - Duration::days(1)).date();
    let start = date.and_time(NaiveTime::MIN);
    let end = start + Duration::days(1) - Duration::microseconds(1);
    (date, start, end)
}

/// Most frequent non-empty condition. Ties go to the lexicographically
/// smallest condition; `None` when there are no non-empty conditions.
pub fn dominant_condition<'a, I>(conditions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for condition in conditions.into_iter().map(str::trim) {
        if !condition.is_empty() {
            *counts.entry(condition).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(a, a_count), (b, b_count)| a_count.cmp(b_count).then_with(|| b.cmp(a)))
        .map(|(condition, _)| condition.to_string())
}

/// Aggregate a set of readings. `None` for an empty set.
pub fn summarize_readings(readings: &[WeatherReading]) -> Option<TemperatureSummary> {
    let first = readings.first()?;

    let mut sum = Decimal::ZERO;
    let mut max_temp = first.temp;
    let mut min_temp = first.temp;
    for r in readings {
        sum += r.temp;
        max_temp = max_temp.max(r.temp);
        min_temp = min_temp.min(r.temp);
    }
    let avg_temp = (sum / Decimal::from(readings.len())).round_dp(2);

    Some(TemperatureSummary {
        avg_temp,
        max_temp,
        min_temp,
        dominant_condition: dominant_condition(readings.iter().map(|r| r.main.as_str())),
    })
}

/// Write yesterday's summary for every city that has readings in the window.
///
/// Cities without readings get no row. A store failure for one city is
/// logged and does not stop the others. Returns the number of rows written.
pub async fn summarize_yesterday(
    store: &dyn WeatherStore,
    cities: &[String],
    now: NaiveDateTime,
) -> usize {
    let (date, start, end) = yesterday_window(now);
    let mut written = 0;

    for city in cities {
        let readings = match store.readings_between(city, start, end).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("Summary: failed to load readings for {} on {}: {}", city, date, e);
                continue;
            }
        };

        let Some(summary) = summarize_readings(&readings) else {
            tracing::debug!("Summary: no readings for {} on {}, skipping", city, date);
            continue;
        };

        let row = NewDailySummary {
            city: city.clone(),
            date,
            avg_temp: summary.avg_temp,
            max_temp: summary.max_temp,
            min_temp: summary.min_temp,
            dominant_condition: summary.dominant_condition,
        };

        match store.upsert_daily_summary(&row).await {
            Ok(_) => {
                written += 1;
                tracing::debug!(
                    "Summary: {} on {} avg={} max={} min={} dominant={:?} ({} readings)",
                    city,
                    date,
                    row.avg_temp,
                    row.max_temp,
                    row.min_temp,
                    row.dominant_condition,
                    readings.len(),
                );
            }
            Err(e) => {
                tracing::error!("Summary: failed to write summary for {} on {}: {}", city, date, e);
            }
        }
    }

    written
}
