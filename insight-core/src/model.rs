use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, WeatherError};

/// Label used when neither the provider nor the caller names the place.
pub const CURRENT_LOCATION_LABEL: &str = "Current Location";

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, WeatherError> {
        let lat_ok = (-90.0..=90.0).contains(&latitude);
        let lon_ok = (-180.0..=180.0).contains(&longitude);

        if !lat_ok || !lon_ok {
            return Err(WeatherError::InvalidCoordinate { latitude, longitude });
        }

        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A coordinate plus an optional human-readable name for it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationQuery {
    pub coordinate: Coordinate,
    /// `None` when the coordinate came from geolocation.
    pub label: Option<String>,
}

impl LocationQuery {
    pub fn new(coordinate: Coordinate, label: Option<String>) -> Self {
        Self { coordinate, label }
    }

    /// Pick the display name: provider name, then our label, then the default.
    pub fn display_name(&self, provider_name: Option<&str>) -> String {
        provider_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.label.as_deref().filter(|l| !l.trim().is_empty()))
            .unwrap_or(CURRENT_LOCATION_LABEL)
            .to_string()
    }
}

/// Sky condition as reported by the provider (`weather[0]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Condition group, e.g. "Clear" or "Rain".
    pub main: Option<String>,
    pub description: Option<String>,
    /// Provider icon code, e.g. "01d".
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_gust_mps: Option<f64>,
    pub visibility_m: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    /// Shift of the location's local time from UTC, in seconds.
    pub utc_offset_secs: Option<i32>,
    pub condition: Condition,
}

impl CurrentConditions {
    pub fn local_offset(&self) -> FixedOffset {
        local_offset(self.utc_offset_secs)
    }
}

/// One interval of the forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub time: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    pub temp_max_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub pressure_hpa: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub wind_gust_mps: Option<f64>,
    pub visibility_m: Option<f64>,
    pub condition: Condition,
}

/// Per-day aggregate of forecast intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub low_c: f64,
    pub high_c: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub entries: Vec<ForecastEntry>,
    pub utc_offset_secs: Option<i32>,
}

impl ForecastSeries {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group the intervals by local calendar day.
    ///
    /// Each day reports the min/max over all its intervals and the condition
    /// of the interval closest to local noon.
    pub fn daily(&self) -> Vec<DailySummary> {
        let offset = local_offset(self.utc_offset_secs);
        let mut days: BTreeMap<NaiveDate, Vec<&ForecastEntry>> = BTreeMap::new();

        for entry in &self.entries {
            let local = entry.time.with_timezone(&offset);
            days.entry(local.date_naive()).or_default().push(entry);
        }

        days.into_iter()
            .filter_map(|(date, entries)| {
                let low_c = entries
                    .iter()
                    .map(|e| e.temp_min_c.unwrap_or(e.temperature_c))
                    .fold(f64::INFINITY, f64::min);
                let high_c = entries
                    .iter()
                    .map(|e| e.temp_max_c.unwrap_or(e.temperature_c))
                    .fold(f64::NEG_INFINITY, f64::max);
                let noonish = entries.iter().min_by_key(|e| {
                    (i64::from(e.time.with_timezone(&offset).hour()) - 12).abs()
                })?;

                Some(DailySummary {
                    date,
                    low_c,
                    high_c,
                    condition: noonish.condition.clone(),
                })
            })
            .collect()
    }
}

/// Current conditions and forecast for one resolved location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub city: String,
    pub current: CurrentConditions,
    pub forecast: ForecastSeries,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Current,
    Forecast,
}

impl ActiveTab {
    pub fn toggled(self) -> Self {
        match self {
            ActiveTab::Current => ActiveTab::Forecast,
            ActiveTab::Forecast => ActiveTab::Current,
        }
    }
}

/// Error surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WeatherError> for ErrorInfo {
    fn from(err: &WeatherError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything the presentation layer renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub snapshot: Option<WeatherSnapshot>,
    pub is_loading: bool,
    pub error: Option<ErrorInfo>,
    pub active_tab: ActiveTab,
    pub last_known_location: Option<Coordinate>,
}

impl ViewState {
    /// Snapshot worth showing: present, not loading and no error on screen.
    pub fn displayable(&self) -> Option<&WeatherSnapshot> {
        if self.is_loading || self.error.is_some() {
            return None;
        }
        self.snapshot.as_ref()
    }
}

fn local_offset(secs: Option<i32>) -> FixedOffset {
    secs.and_then(FixedOffset::east_opt).unwrap_or_else(|| Utc.fix())
}
