//! Background polling scheduler.
//!
//! Every cycle fetches current conditions for each monitored city, stores new
//! readings, then recomputes yesterday's summaries and the heat alerts.
//!
//! Architecture:
//! - One tokio task owned by `main`, stopped through a `CancellationToken`
//! - The sleep runs *after* the cycle's work, so the effective period is
//!   cycle duration + interval
//! - Each cycle runs in its own spawned task; a cycle that panics is logged
//!   and the loop carries on with the next one
//! - State is in-memory (`Arc<RwLock<SchedulerState>>`) and exposed via the
//!   status endpoint

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use crate::helpers::{format_local, local_now};
use crate::services::alerts::detect_alerts;
use crate::services::openweather::{SharedProvider, WeatherProvider};
use crate::services::store::{SharedStore, WeatherStore};
use crate::services::summary::summarize_yesterday;

// ---------------------------------------------------------------------------
// Scheduler state (in-memory, shared via Arc<RwLock<>>)
// ---------------------------------------------------------------------------

/// Outcome of the last poll for one city.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CityPollStatus {
    pub city: String,
    /// Observation time of the last reading returned by the provider.
    pub last_observed_at: Option<String>,
    /// "stored", "duplicate", "provider_error: ..." or "store_error: ..."
    pub last_poll_result: String,
}

/// Global scheduler state, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SchedulerState {
    pub active: bool,
    pub next_wakeup_at: Option<DateTime<Utc>>,
    pub last_cycle_completed_at: Option<DateTime<Utc>>,
    pub last_cycle_duration_ms: Option<u64>,
    /// Set when the last cycle aborted before finishing.
    pub last_cycle_error: Option<String>,
    pub total_cycles: u64,
    pub cities: Vec<CityPollStatus>,
}

impl SchedulerState {
    pub fn new() -> Self {
        Self {
            active: true,
            next_wakeup_at: None,
            last_cycle_completed_at: None,
            last_cycle_duration_ms: None,
            last_cycle_error: None,
            total_cycles: 0,
            cities: Vec::new(),
        }
    }
}

/// Shared scheduler state handle.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub cities: Vec<String>,
    pub interval: std::time::Duration,
}

/// What one cycle did.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub summaries_written: usize,
    pub alerts_raised: usize,
    pub cities: Vec<CityPollStatus>,
}

// ---------------------------------------------------------------------------
// Single-city poll
// ---------------------------------------------------------------------------

enum PollResult {
    Stored(NaiveDateTime),
    Duplicate(NaiveDateTime),
    ProviderError(String),
    StoreError(NaiveDateTime, String),
}

/// Fetch one city and store the reading if new. Never fails: provider and
/// store errors are logged and reported in the result.
async fn poll_city(
    store: &dyn WeatherStore,
    provider: &dyn WeatherProvider,
    city: &str,
) -> PollResult {
    let reading = match provider.fetch_current(city).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("Scheduler: failed to fetch weather for {}: {}", city, e);
            return PollResult::ProviderError(e.to_string());
        }
    };

    match store.store_if_absent(&reading).await {
        Ok(true) => {
            tracing::debug!(
                "Scheduler: stored {} at {} ({} °C, {})",
                city,
                reading.dt,
                reading.temp,
                reading.main
            );
            PollResult::Stored(reading.dt)
        }
        Ok(false) => {
            tracing::debug!("Scheduler: {} at {} already stored", city, reading.dt);
            PollResult::Duplicate(reading.dt)
        }
        Err(e) => {
            tracing::error!("Scheduler: failed to store reading for {}: {}", city, e);
            PollResult::StoreError(reading.dt, e.to_string())
        }
    }
}

impl PollResult {
    fn into_status(self, city: &str) -> CityPollStatus {
        let (last_observed_at, last_poll_result) = match self {
            PollResult::Stored(dt) => (Some(format_local(dt)), "stored".to_string()),
            PollResult::Duplicate(dt) => (Some(format_local(dt)), "duplicate".to_string()),
            PollResult::ProviderError(msg) => (None, format!("provider_error: {}", msg)),
            PollResult::StoreError(dt, msg) => {
                (Some(format_local(dt)), format!("store_error: {}", msg))
            }
        };
        CityPollStatus {
            city: city.to_string(),
            last_observed_at,
            last_poll_result,
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// Run one full cycle: poll every city, then summaries, then alerts.
pub async fn run_cycle(
    store: &dyn WeatherStore,
    provider: &dyn WeatherProvider,
    cities: &[String],
) -> CycleReport {
    let mut report = CycleReport::default();

    for city in cities {
        let result = poll_city(store, provider, city).await;
        match result {
            PollResult::Stored(_) => report.stored += 1,
            PollResult::Duplicate(_) => report.duplicates += 1,
            PollResult::ProviderError(_) | PollResult::StoreError(..) => report.failed += 1,
        }
        report.cities.push(result.into_status(city));
    }

    report.summaries_written = summarize_yesterday(store, cities, local_now()).await;
    report.alerts_raised = detect_alerts(store, cities, local_now()).await;

    report
}

// ---------------------------------------------------------------------------
// Main scheduler loop
// ---------------------------------------------------------------------------

/// Run the scheduler until `shutdown` is cancelled.
///
/// Should be spawned via `tokio::spawn(run_scheduler(...))`.
pub async fn run_scheduler(
    store: SharedStore,
    provider: SharedProvider,
    settings: SchedulerSettings,
    state: SharedSchedulerState,
    shutdown: CancellationToken,
) {
    tracing::info!(
        "Scheduler started: {} cities, {}s interval",
        settings.cities.len(),
        settings.interval.as_secs()
    );

    loop {
        let cycle_start = Utc::now();

        let mut cycle = tokio::spawn({
            let store = store.clone();
            let provider = provider.clone();
            let cities = settings.cities.clone();
            async move { run_cycle(store.as_ref(), provider.as_ref(), &cities).await }
        });

        let outcome = tokio::select! {
            joined = &mut cycle => joined.map_err(|e| e.to_string()),
            _ = shutdown.cancelled() => {
                cycle.abort();
                tracing::info!("Scheduler: shutdown requested mid-cycle");
                break;
            }
        };

        finalize_cycle(&state, outcome, cycle_start, settings.interval).await;

        tokio::select! {
            _ = tokio::time::sleep(settings.interval) => {}
            _ = shutdown.cancelled() => break,
        }
    }

    let mut s = state.write().await;
    s.active = false;
    s.next_wakeup_at = None;
    tracing::info!("Scheduler stopped after {} cycles", s.total_cycles);
}

/// Record the cycle outcome in the shared state.
async fn finalize_cycle(
    state: &SharedSchedulerState,
    outcome: Result<CycleReport, String>,
    cycle_start: DateTime<Utc>,
    interval: std::time::Duration,
) {
    let now = Utc::now();
    let duration_ms = (now - cycle_start).num_milliseconds().max(0) as u64;
    let next_wakeup = Duration::from_std(interval).ok().map(|d| now + d);

    let mut s = state.write().await;
    s.total_cycles += 1;
    s.last_cycle_completed_at = Some(now);
    s.last_cycle_duration_ms = Some(duration_ms);
    s.next_wakeup_at = next_wakeup;

    match outcome {
        Ok(report) => {
            tracing::info!(
                "Scheduler: cycle complete in {}ms: {} stored, {} duplicate, {} failed, \
                 {} summaries, {} alerts",
                duration_ms,
                report.stored,
                report.duplicates,
                report.failed,
                report.summaries_written,
                report.alerts_raised,
            );
            s.last_cycle_error = None;
            s.cities = report.cities;
        }
        Err(e) => {
            tracing::error!("Scheduler: cycle aborted after {}ms: {}", duration_ms, e);
            s.last_cycle_error = Some(e);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
