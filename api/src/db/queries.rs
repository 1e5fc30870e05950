use chrono::{NaiveDate, NaiveDateTime};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Alert, DailySummary, NewDailySummary, NewReading, WeatherReading};

const READING_COLUMNS: &str = "id, city, main, temp, feels_like, humidity, wind_speed, dt";

/// Insert a reading unless one already exists for the same (city, dt).
///
/// Returns `true` when a row was inserted. The existence check and insert run
/// in one transaction, and the insert is additionally guarded by the
/// `weather_data_city_dt_key` constraint, so a concurrent writer cannot
/// produce a duplicate either.
pub async fn insert_reading_if_absent(
    pool: &PgPool,
    reading: &NewReading,
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM weather_data WHERE city = $1 AND dt = $2)",
    )
    .bind(&reading.city)
    .bind(reading.dt)
    .fetch_one(&mut *tx)
    .await?;

    if exists {
        tx.commit().await?;
        return Ok(false);
    }

    let result = sqlx::query(
        "INSERT INTO weather_data (id, city, main, temp, feels_like, humidity, wind_speed, dt)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (city, dt) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(&reading.city)
    .bind(&reading.main)
    .bind(reading.temp)
    .bind(reading.feels_like)
    .bind(reading.humidity)
    .bind(reading.wind_speed)
    .bind(reading.dt)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(result.rows_affected() == 1)
}

/// All readings for a city with `start <= dt <= end`, oldest first.
pub async fn get_readings_between(
    pool: &PgPool,
    city: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Vec<WeatherReading>, sqlx::Error> {
    sqlx::query_as::<_, WeatherReading>(&format!(
        "SELECT {READING_COLUMNS}
         FROM weather_data
         WHERE city = $1 AND dt BETWEEN $2 AND $3
         ORDER BY dt"
    ))
    .bind(city)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// The `limit` most recently observed readings for a city, newest first.
pub async fn get_latest_readings(
    pool: &PgPool,
    city: &str,
    limit: i64,
) -> Result<Vec<WeatherReading>, sqlx::Error> {
    sqlx::query_as::<_, WeatherReading>(&format!(
        "SELECT {READING_COLUMNS}
         FROM weather_data
         WHERE city = $1
         ORDER BY dt DESC
         LIMIT $2"
    ))
    .bind(city)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Readings observed at or after `cutoff`, optionally for a single city, oldest first.
pub async fn get_readings_since(
    pool: &PgPool,
    city: Option<&str>,
    cutoff: NaiveDateTime,
) -> Result<Vec<WeatherReading>, sqlx::Error> {
    match city {
        Some(city) => {
            sqlx::query_as::<_, WeatherReading>(&format!(
                "SELECT {READING_COLUMNS}
                 FROM weather_data
                 WHERE city = $1 AND dt >= $2
                 ORDER BY dt"
            ))
            .bind(city)
            .bind(cutoff)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, WeatherReading>(&format!(
                "SELECT {READING_COLUMNS}
                 FROM weather_data
                 WHERE dt >= $1
                 ORDER BY dt"
            ))
            .bind(cutoff)
            .fetch_all(pool)
            .await
        }
    }
}

/// Write the summary for (city, date), replacing any earlier row for the same day.
pub async fn upsert_daily_summary(
    pool: &PgPool,
    summary: &NewDailySummary,
) -> Result<DailySummary, sqlx::Error> {
    sqlx::query_as::<_, DailySummary>(
        "INSERT INTO daily_summaries
            (id, city, date, avg_temp, max_temp, min_temp, dominant_condition)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (city, date) DO UPDATE SET
            avg_temp = EXCLUDED.avg_temp,
            max_temp = EXCLUDED.max_temp,
            min_temp = EXCLUDED.min_temp,
            dominant_condition = EXCLUDED.dominant_condition,
            updated_at = NOW()
         RETURNING id, city, date, avg_temp, max_temp, min_temp, dominant_condition",
    )
    .bind(Uuid::new_v4())
    .bind(&summary.city)
    .bind(summary.date)
    .bind(summary.avg_temp)
    .bind(summary.max_temp)
    .bind(summary.min_temp)
    .bind(&summary.dominant_condition)
    .fetch_one(pool)
    .await
}

/// Daily summaries on or after `since`, optionally for one city, newest date first.
pub async fn get_daily_summaries(
    pool: &PgPool,
    city: Option<&str>,
    since: NaiveDate,
) -> Result<Vec<DailySummary>, sqlx::Error> {
    match city {
        Some(city) => {
            sqlx::query_as::<_, DailySummary>(
                "SELECT id, city, date, avg_temp, max_temp, min_temp, dominant_condition
                 FROM daily_summaries
                 WHERE city = $1 AND date >= $2
                 ORDER BY date DESC, city",
            )
            .bind(city)
            .bind(since)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query_as::<_, DailySummary>(
                "SELECT id, city, date, avg_temp, max_temp, min_temp, dominant_condition
                 FROM daily_summaries
                 WHERE date >= $1
                 ORDER BY date DESC, city",
            )
            .bind(since)
            .fetch_all(pool)
            .await
        }
    }
}

/// Insert a new alert (append-only).
pub async fn insert_alert(
    pool: &PgPool,
    city: &str,
    message: &str,
    timestamp: NaiveDateTime,
) -> Result<Alert, sqlx::Error> {
    sqlx::query_as::<_, Alert>(
        r#"INSERT INTO alerts (id, city, message, "timestamp")
           VALUES ($1, $2, $3, $4)
           RETURNING id, city, message, "timestamp""#,
    )
    .bind(Uuid::new_v4())
    .bind(city)
    .bind(message)
    .bind(timestamp)
    .fetch_one(pool)
    .await
}

/// The `limit` most recent alerts, newest first.
pub async fn get_recent_alerts(pool: &PgPool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
    sqlx::query_as::<_, Alert>(
        r#"SELECT id, city, message, "timestamp"
           FROM alerts
           ORDER BY "timestamp" DESC
           LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
