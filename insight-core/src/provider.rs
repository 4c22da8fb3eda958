use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

use crate::{
    error::WeatherError,
    model::{Coordinate, CurrentConditions, ForecastSeries},
};

pub mod openweather;

/// Which provider endpoint produced a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Current,
    Forecast,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Current => "current",
            Endpoint::Forecast => "forecast",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `cod` field of a provider payload.
///
/// OpenWeather reports the current-weather code as a number and the
/// forecast code as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderCode {
    Number(i64),
    Text(String),
}

/// The one place that knows what "ok" looks like for each endpoint.
pub fn is_provider_success(endpoint: Endpoint, code: &ProviderCode) -> bool {
    match (endpoint, code) {
        (Endpoint::Current, ProviderCode::Number(n)) => *n == 200,
        (Endpoint::Forecast, ProviderCode::Text(s)) => s == "200",
        _ => false,
    }
}

/// Source of current conditions and forecasts for a coordinate.
///
/// Implementations must stop work and return [`WeatherError::Cancelled`]
/// once `cancel` fires.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<CurrentReport, WeatherError>;

    async fn forecast(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<ForecastSeries, WeatherError>;
}

/// Validated current-conditions payload.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReport {
    /// Place name as reported by the provider, if any.
    pub location_name: Option<String>,
    pub conditions: CurrentConditions,
}
