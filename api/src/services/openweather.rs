//! OpenWeatherMap client.
//!
//! Fetches current conditions and the 5-day / 3-hour forecast by city name,
//! in metric units. See: https://openweathermap.org/current and
//! https://openweathermap.org/forecast5

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::db::models::NewReading;
use crate::errors::ProviderError;
use crate::helpers::{epoch_to_local, f64_to_decimal_2dp};

/// One step of the provider's multi-day forecast. Not persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastPoint {
    pub observed_at: NaiveDateTime,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    pub description: String,
}

/// Source of weather data for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current conditions for `city`.
    async fn fetch_current(&self, city: &str) -> Result<NewReading, ProviderError>;

    /// Multi-point forecast for `city`.
    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastPoint>, ProviderError>;
}

pub type SharedProvider = Arc<dyn WeatherProvider>;

/// Client for the OpenWeatherMap 2.5 API.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// --- OpenWeatherMap JSON response types ---

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: i32,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmForecastEntry {
    dt: i64,
    main: OwmMain,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    wind: OwmWind,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    list: Vec<OwmForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `{base_url}/{endpoint}` for a city and return the raw body on success.
    async fn get_city(&self, endpoint: &str, city: &str) -> Result<String, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::UnknownCity(city.to_string()));
        }

        if !status.is_success() {
            let message = serde_json::from_str::<OwmErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_current(&self, city: &str) -> Result<NewReading, ProviderError> {
        let body = self.get_city("weather", city).await?;
        parse_current(city, &body)
    }

    async fn fetch_forecast(&self, city: &str) -> Result<Vec<ForecastPoint>, ProviderError> {
        let body = self.get_city("forecast", city).await?;
        parse_forecast(&body)
    }
}

/// Map a current-weather payload to a reading for `city`.
///
/// The reading carries the requested city name rather than the provider's
/// resolved name, so the (city, dt) key matches the monitored list.
fn parse_current(city: &str, body: &str) -> Result<NewReading, ProviderError> {
    let parsed: OwmCurrentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("current weather JSON: {}", e)))?;

    let dt = epoch_to_local(parsed.dt)
        .ok_or_else(|| ProviderError::Decode(format!("invalid timestamp {}", parsed.dt)))?;

    let main = parsed
        .weather
        .first()
        .map(|w| w.main.clone())
        .unwrap_or_default();

    Ok(NewReading {
        city: city.to_string(),
        main,
        temp: f64_to_decimal_2dp(parsed.main.temp),
        feels_like: f64_to_decimal_2dp(parsed.main.feels_like),
        humidity: parsed.main.humidity,
        wind_speed: f64_to_decimal_2dp(parsed.wind.speed),
        dt,
    })
}

fn parse_forecast(body: &str) -> Result<Vec<ForecastPoint>, ProviderError> {
    let parsed: OwmForecastResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("forecast JSON: {}", e)))?;

    parsed
        .list
        .into_iter()
        .map(|entry| {
            let observed_at = epoch_to_local(entry.dt)
                .ok_or_else(|| ProviderError::Decode(format!("invalid timestamp {}", entry.dt)))?;
            Ok(ForecastPoint {
                observed_at,
                temperature: entry.main.temp,
                feels_like: entry.main.feels_like,
                humidity: entry.main.humidity,
                wind_speed: entry.wind.speed,
                description: entry
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.description)
                    .unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_json() -> serde_json::Value {
        serde_json::json!({
            "coord": { "lon": 77.2167, "lat": 28.6667 },
            "weather": [
                { "id": 721, "main": "Haze", "description": "haze", "icon": "50d" }
            ],
            "main": {
                "temp": 36.05,
                "feels_like": 38.4,
                "temp_min": 36.05,
                "temp_max": 36.05,
                "pressure": 1008,
                "humidity": 41
            },
            "wind": { "speed": 3.6, "deg": 290 },
            "dt": 1729245600,
            "name": "Delhi",
            "cod": 200
        })
    }

    fn forecast_json() -> serde_json::Value {
        serde_json::json!({
            "cod": "200",
            "cnt": 2,
            "list": [
                {
                    "dt": 1729252800,
                    "main": { "temp": 33.1, "feels_like": 34.0, "humidity": 45 },
                    "weather": [{ "main": "Clear", "description": "clear sky" }],
                    "wind": { "speed": 2.1 }
                },
                {
                    "dt": 1729263600,
                    "main": { "temp": 29.4, "feels_like": 30.2, "humidity": 58 },
                    "weather": [{ "main": "Clouds", "description": "scattered clouds" }],
                    "wind": { "speed": 1.7 }
                }
            ],
            "city": { "name": "Delhi", "country": "IN" }
        })
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new("test_key", &server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_current_maps_fields() {
        let reading = parse_current("Delhi", &current_json().to_string()).unwrap();
        assert_eq!(reading.city, "Delhi");
        assert_eq!(reading.main, "Haze");
        assert_eq!(reading.temp, Decimal::from_str("36.05").unwrap());
        assert_eq!(reading.feels_like, Decimal::from_str("38.40").unwrap());
        assert_eq!(reading.humidity, 41);
        assert_eq!(reading.wind_speed, Decimal::from_str("3.6").unwrap());
        assert_eq!(Some(reading.dt), epoch_to_local(1729245600));
    }

    #[test]
    fn test_parse_current_without_conditions() {
        let mut json = current_json();
        json["weather"] = serde_json::json!([]);
        let reading = parse_current("Delhi", &json.to_string()).unwrap();
        assert_eq!(reading.main, "");
    }

    #[test]
    fn test_parse_current_malformed() {
        let err = parse_current("Delhi", r#"{"dt": 1}"#).unwrap_err();
        assert!(matches!(err, ProviderError::Decode(_)));
    }

    #[test]
    fn test_parse_forecast_maps_each_entry() {
        let points = parse_forecast(&forecast_json().to_string()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].description, "clear sky");
        assert_eq!(points[1].humidity, 58);
        assert!((points[1].temperature - 29.4).abs() < 1e-9);
        assert_eq!(Some(points[0].observed_at), epoch_to_local(1729252800));
    }

    #[tokio::test]
    async fn test_fetch_current_sends_metric_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "Delhi"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .expect(1)
            .mount(&server)
            .await;

        let reading = client_for(&server).fetch_current("Delhi").await.unwrap();
        assert_eq!(reading.main, "Haze");
    }

    #[tokio::test]
    async fn test_fetch_current_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401,
                "message": "Invalid API key."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_current("Delhi").await.unwrap_err();
        match err {
            ProviderError::Status { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_forecast_unknown_city() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch_forecast("Atlantis")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownCity(ref c) if c == "Atlantis"));
    }

    #[tokio::test]
    async fn test_fetch_forecast_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Delhi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .mount(&server)
            .await;

        let points = client_for(&server).fetch_forecast("Delhi").await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].description, "scattered clouds");
    }

    #[tokio::test]
    async fn test_fetch_current_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(current_json())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            OpenWeatherClient::new("test_key", &server.uri(), Duration::from_millis(50)).unwrap();
        let err = client.fetch_current("Delhi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
