use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::WeatherError,
    model::{Condition, Coordinate, CurrentConditions, ForecastEntry, ForecastSeries},
    provider::{CurrentReport, Endpoint, ProviderCode, is_provider_success},
};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?;
        Self::new(api_key, config.api_base_url.clone(), config.timeout())
            .context("Failed to build OpenWeather HTTP client")
    }

    fn endpoint_url(&self, endpoint: Endpoint) -> String {
        let path = match endpoint {
            Endpoint::Current => "weather",
            Endpoint::Forecast => "forecast",
        };
        format!("{}/{}", self.base_url, path)
    }

    /// GET the endpoint and deserialize its body, racing the cancel token.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<(StatusCode, T), WeatherError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%endpoint, "OpenWeather request cancelled");
                Err(WeatherError::Cancelled)
            }
            res = self.fetch_inner(endpoint, coordinate) => res,
        }
    }

    async fn fetch_inner<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        coordinate: Coordinate,
    ) -> Result<(StatusCode, T), WeatherError> {
        let url = self.endpoint_url(endpoint);
        tracing::debug!(%endpoint, %url, %coordinate, "Requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", coordinate.latitude().to_string()),
                ("lon", coordinate.longitude().to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok((status, parsed)),
            Err(e) if !status.is_success() => {
                tracing::warn!(%endpoint, %status, error = %e, "OpenWeather returned unparseable error body");
                Err(WeatherError::provider(Some(format!(
                    "OpenWeather {endpoint} request failed with status {status}: {}",
                    truncate_body(&body)
                ))))
            }
            Err(e) => Err(WeatherError::MalformedResponse(format!(
                "OpenWeather {endpoint} body is not valid JSON: {e}"
            ))),
        }
    }
}

/// Check `cod`, falling back to the HTTP status when the body omits it.
fn check_status(
    endpoint: Endpoint,
    status: StatusCode,
    cod: Option<&ProviderCode>,
    message: Option<&serde_json::Value>,
) -> Result<(), WeatherError> {
    match cod {
        Some(code) if is_provider_success(endpoint, code) => Ok(()),
        Some(code) => {
            tracing::warn!(%endpoint, ?code, "OpenWeather reported failure");
            Err(WeatherError::provider(message_text(message)))
        }
        None if !status.is_success() => Err(WeatherError::provider(message_text(message))),
        None => Err(WeatherError::MalformedResponse(format!(
            "OpenWeather {endpoint} response has no status code"
        ))),
    }
}

/// `message` is error text on failure but a number on forecast success.
fn message_text(message: Option<&serde_json::Value>) -> Option<String> {
    message.and_then(|m| m.as_str()).map(str::to_string)
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
    gust: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    cod: Option<ProviderCode>,
    message: Option<serde_json::Value>,
    name: Option<String>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    visibility: Option<f64>,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: Option<i64>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    cod: Option<ProviderCode>,
    message: Option<serde_json::Value>,
    city: Option<OwCity>,
    list: Option<Vec<OwForecastEntry>>,
}

fn condition(weather: Vec<OwWeather>) -> Condition {
    weather
        .into_iter()
        .next()
        .map(|w| Condition {
            main: w.main,
            description: w.description,
            icon: w.icon,
        })
        .unwrap_or_default()
}

fn humidity(value: Option<f64>) -> Option<u8> {
    value.map(|h| h.round().clamp(0.0, 100.0) as u8)
}

impl OwCurrentResponse {
    fn into_report(self) -> Result<CurrentReport, WeatherError> {
        let main = self.main.ok_or_else(|| {
            WeatherError::MalformedResponse("current response has no `main` block".into())
        })?;
        let temperature_c = main.temp.ok_or_else(|| {
            WeatherError::MalformedResponse("current response has no `main.temp`".into())
        })?;
        let wind = self.wind.unwrap_or_default();
        let sys = self.sys.unwrap_or_default();

        Ok(CurrentReport {
            location_name: self.name,
            conditions: CurrentConditions {
                temperature_c,
                feels_like_c: main.feels_like,
                temp_min_c: main.temp_min,
                temp_max_c: main.temp_max,
                humidity_pct: humidity(main.humidity),
                pressure_hpa: main.pressure,
                wind_speed_mps: wind.speed,
                wind_gust_mps: wind.gust,
                visibility_m: self.visibility,
                sunrise: sys.sunrise.and_then(unix_to_utc),
                sunset: sys.sunset.and_then(unix_to_utc),
                utc_offset_secs: self.timezone,
                condition: condition(self.weather),
            },
        })
    }
}

impl OwForecastEntry {
    fn into_entry(self, index: usize) -> Result<ForecastEntry, WeatherError> {
        let time = self.dt.and_then(unix_to_utc).ok_or_else(|| {
            WeatherError::MalformedResponse(format!("forecast entry {index} has no valid `dt`"))
        })?;
        let main = self.main.unwrap_or_default();
        let temperature_c = main.temp.ok_or_else(|| {
            WeatherError::MalformedResponse(format!("forecast entry {index} has no `main.temp`"))
        })?;
        let wind = self.wind.unwrap_or_default();

        Ok(ForecastEntry {
            time,
            temperature_c,
            feels_like_c: main.feels_like,
            temp_min_c: main.temp_min,
            temp_max_c: main.temp_max,
            humidity_pct: humidity(main.humidity),
            pressure_hpa: main.pressure,
            wind_speed_mps: wind.speed,
            wind_gust_mps: wind.gust,
            visibility_m: self.visibility,
            condition: condition(self.weather),
        })
    }
}

impl OwForecastResponse {
    fn into_series(self) -> Result<ForecastSeries, WeatherError> {
        let list = self.list.ok_or_else(|| {
            WeatherError::MalformedResponse("forecast response has no `list`".into())
        })?;

        let entries = list
            .into_iter()
            .enumerate()
            .map(|(i, e)| e.into_entry(i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ForecastSeries {
            entries,
            utc_offset_secs: self.city.and_then(|c| c.timezone),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<CurrentReport, WeatherError> {
        let (status, parsed): (_, OwCurrentResponse) =
            self.fetch(Endpoint::Current, coordinate, cancel).await?;
        check_status(Endpoint::Current, status, parsed.cod.as_ref(), parsed.message.as_ref())?;
        parsed.into_report()
    }

    async fn forecast(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<ForecastSeries, WeatherError> {
        let (status, parsed): (_, OwForecastResponse) =
            self.fetch(Endpoint::Forecast, coordinate, cancel).await?;
        check_status(Endpoint::Forecast, status, parsed.cod.as_ref(), parsed.message.as_ref())?;
        parsed.into_series()
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_current(json: serde_json::Value) -> OwCurrentResponse {
        serde_json::from_value(json).expect("valid current payload")
    }

    #[test]
    fn current_missing_cosmetic_fields_still_converts() {
        let parsed = parse_current(serde_json::json!({
            "cod": 200,
            "main": { "temp": 21.4 },
            "weather": []
        }));
        check_status(Endpoint::Current, StatusCode::OK, parsed.cod.as_ref(), None)
            .expect("ok code");

        let report = parsed.into_report().expect("converts");
        assert_eq!(report.conditions.temperature_c, 21.4);
        assert!(report.location_name.is_none());
        assert!(report.conditions.wind_gust_mps.is_none());
        assert!(report.conditions.sunrise.is_none());
        assert_eq!(report.conditions.condition, Condition::default());
    }

    #[test]
    fn current_without_temperature_is_malformed() {
        let parsed = parse_current(serde_json::json!({
            "cod": 200,
            "name": "Nowhere",
            "main": { "humidity": 40 }
        }));
        let err = parsed.into_report().unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }

    #[test]
    fn failure_code_uses_provider_message() {
        let parsed = parse_current(serde_json::json!({ "cod": 404, "message": "city not found" }));
        let err = check_status(
            Endpoint::Current,
            StatusCode::NOT_FOUND,
            parsed.cod.as_ref(),
            parsed.message.as_ref(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "city not found");
    }

    #[test]
    fn missing_code_on_ok_status_is_malformed() {
        let err = check_status(Endpoint::Forecast, StatusCode::OK, None, None).unwrap_err();
        assert!(matches!(err, WeatherError::MalformedResponse(_)));
    }

    #[test]
    fn numeric_forecast_message_is_not_error_text() {
        let msg = serde_json::json!(0);
        assert_eq!(message_text(Some(&msg)), None);
    }

    #[test]
    fn forecast_entry_without_dt_is_malformed() {
        let parsed: OwForecastResponse = serde_json::from_value(serde_json::json!({
            "cod": "200",
            "list": [ { "main": { "temp": 3.0 } } ]
        }))
        .expect("valid forecast payload");
        assert!(matches!(parsed.into_series(), Err(WeatherError::MalformedResponse(_))));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
    }
}
