//! In-memory store and scripted provider for pipeline and handler tests.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::db::models::{Alert, DailySummary, NewDailySummary, NewReading, WeatherReading};
use crate::errors::ProviderError;
use crate::services::openweather::{ForecastPoint, WeatherProvider};
use crate::services::store::WeatherStore;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn reading(city: &str, main: &str, temp: &str, dt: NaiveDateTime) -> NewReading {
    NewReading {
        city: city.to_string(),
        main: main.to_string(),
        temp: dec(temp),
        feels_like: dec(temp),
        humidity: 40,
        wind_speed: dec("3.5"),
        dt,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    readings: Mutex<Vec<WeatherReading>>,
    summaries: Mutex<Vec<DailySummary>>,
    alerts: Mutex<Vec<Alert>>,
    fail_all: AtomicBool,
    failing_cities: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail, as if the database were down.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Make writes for one city fail.
    pub fn fail_writes_for(&self, city: &str) {
        self.failing_cities
            .lock()
            .unwrap()
            .insert(city.to_string());
    }

    pub fn readings(&self) -> Vec<WeatherReading> {
        self.readings.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<DailySummary> {
        self.summaries.lock().unwrap().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }

    fn check_city(&self, city: &str) -> Result<(), sqlx::Error> {
        self.check()?;
        if self.failing_cities.lock().unwrap().contains(city) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl WeatherStore for MemoryStore {
    async fn store_if_absent(&self, reading: &NewReading) -> Result<bool, sqlx::Error> {
        self.check_city(&reading.city)?;
        let mut rows = self.readings.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.city == reading.city && r.dt == reading.dt)
        {
            return Ok(false);
        }
        rows.push(WeatherReading {
            id: Uuid::new_v4(),
            city: reading.city.clone(),
            main: reading.main.clone(),
            temp: reading.temp,
            feels_like: reading.feels_like,
            humidity: reading.humidity,
            wind_speed: reading.wind_speed,
            dt: reading.dt,
        });
        Ok(true)
    }

    async fn readings_between(
        &self,
        city: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        self.check()?;
        let mut out: Vec<WeatherReading> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.city == city && r.dt >= start && r.dt <= end)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.dt);
        Ok(out)
    }

    async fn latest_readings(
        &self,
        city: &str,
        limit: i64,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        self.check()?;
        let mut out: Vec<WeatherReading> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.city == city)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.dt.cmp(&a.dt));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn readings_since(
        &self,
        city: Option<&str>,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<WeatherReading>, sqlx::Error> {
        self.check()?;
        let mut out: Vec<WeatherReading> = self
            .readings
            .lock()
            .unwrap()
            .iter()
            .filter(|r| city.map_or(true, |c| r.city == c) && r.dt >= cutoff)
            .cloned()
            .collect();
        out.sort_by_key(|r| r.dt);
        Ok(out)
    }

    async fn upsert_daily_summary(
        &self,
        summary: &NewDailySummary,
    ) -> Result<DailySummary, sqlx::Error> {
        self.check_city(&summary.city)?;
        let mut rows = self.summaries.lock().unwrap();
        let row = DailySummary {
            id: Uuid::new_v4(),
            city: summary.city.clone(),
            date: summary.date,
            avg_temp: summary.avg_temp,
            max_temp: summary.max_temp,
            min_temp: summary.min_temp,
            dominant_condition: summary.dominant_condition.clone(),
        };
        match rows
            .iter_mut()
            .find(|s| s.city == summary.city && s.date == summary.date)
        {
            Some(existing) => {
                let id = existing.id;
                *existing = DailySummary { id, ..row };
                Ok(existing.clone())
            }
            None => {
                rows.push(row.clone());
                Ok(row)
            }
        }
    }

    async fn daily_summaries(
        &self,
        city: Option<&str>,
        since: NaiveDate,
    ) -> Result<Vec<DailySummary>, sqlx::Error> {
        self.check()?;
        let mut out: Vec<DailySummary> = self
            .summaries
            .lock()
            .unwrap()
            .iter()
            .filter(|s| city.map_or(true, |c| s.city == c) && s.date >= since)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.city.cmp(&b.city)));
        Ok(out)
    }

    async fn insert_alert(
        &self,
        city: &str,
        message: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Alert, sqlx::Error> {
        self.check_city(city)?;
        let alert = Alert {
            id: Uuid::new_v4(),
            city: city.to_string(),
            message: message.to_string(),
            timestamp,
        };
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(alert)
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
        self.check()?;
        let mut out = self.alerts.lock().unwrap().clone();
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn ping(&self) -> bool {
        self.check().is_ok()
    }
}

/// Provider that serves canned readings and forecasts, counting calls.
#[derive(Default)]
pub struct ScriptedProvider {
    current: Mutex<HashMap<String, NewReading>>,
    forecast: Mutex<Option<Vec<ForecastPoint>>>,
    panic_on: Mutex<Option<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `reading` for its city until replaced. Cities without a reading fail.
    pub fn set_current(&self, reading: NewReading) {
        self.current
            .lock()
            .unwrap()
            .insert(reading.city.clone(), reading);
    }

    pub fn set_forecast(&self, points: Vec<ForecastPoint>) {
        *self.forecast.lock().unwrap() = Some(points);
    }

    /// Panic when `city` is fetched.
    pub fn panic_on(&self, city: &str) {
        *self.panic_on.lock().unwrap() = Some(city.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn fetch_current(&self, city: &str) -> Result<NewReading, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on.lock().unwrap().as_deref() == Some(city) {
            panic!("scripted provider panic for {city}");
        }
        self.current
            .lock()
            .unwrap()
            .get(city)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
    }

    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastPoint>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.forecast
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::UnknownCity(city.to_string()))
    }
}
