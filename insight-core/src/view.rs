//! Display helpers shared by front-ends: theme selection and the cosmetic
//! fallbacks (`--`, `N/A`) used when the provider omits a field.

use chrono::{DateTime, FixedOffset, Utc};

use crate::model::{ViewState, WeatherSnapshot};

/// Background theme keyed off the current condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    /// Nothing loaded yet.
    Default,
    Clear,
    Clouds,
    Rain,
    Snow,
    Thunderstorm,
    Mist,
    /// Loaded, but the condition is something we have no theme for.
    Neutral,
}

impl Theme {
    pub fn from_condition(main: &str) -> Self {
        match main.trim().to_lowercase().as_str() {
            "clear" => Theme::Clear,
            "clouds" => Theme::Clouds,
            "rain" | "drizzle" => Theme::Rain,
            "snow" => Theme::Snow,
            "thunderstorm" => Theme::Thunderstorm,
            "mist" | "fog" => Theme::Mist,
            _ => Theme::Neutral,
        }
    }

    pub fn for_snapshot(snapshot: Option<&WeatherSnapshot>) -> Self {
        match snapshot.and_then(|s| s.current.condition.main.as_deref()) {
            Some(main) => Theme::from_condition(main),
            None => Theme::Default,
        }
    }

    pub fn for_state(state: &ViewState) -> Self {
        Self::for_snapshot(state.snapshot.as_ref())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Clear => "clear",
            Theme::Clouds => "clouds",
            Theme::Rain => "rain",
            Theme::Snow => "snow",
            Theme::Thunderstorm => "thunderstorm",
            Theme::Mist => "mist",
            Theme::Neutral => "neutral",
        }
    }
}

const MISSING: &str = "--";
const NOT_AVAILABLE: &str = "N/A";

pub fn format_temperature(celsius: Option<f64>) -> String {
    match celsius {
        Some(c) => format!("{}°C", c.round() as i64),
        None => format!("{MISSING}°C"),
    }
}

pub fn format_humidity(pct: Option<u8>) -> String {
    match pct {
        Some(p) => format!("{p}%"),
        None => format!("{MISSING}%"),
    }
}

pub fn format_pressure(hpa: Option<f64>) -> String {
    match hpa {
        Some(p) => format!("{} hPa", p.round() as i64),
        None => format!("{MISSING} hPa"),
    }
}

pub fn format_visibility(meters: Option<f64>) -> String {
    match meters {
        Some(m) => format!("{:.1} km", m / 1000.0),
        None => format!("{MISSING} km"),
    }
}

pub fn format_wind_speed(mps: Option<f64>) -> String {
    match mps {
        Some(s) => format!("{s} m/s"),
        None => format!("{MISSING} m/s"),
    }
}

pub fn format_wind_gust(mps: Option<f64>) -> String {
    match mps {
        Some(g) => format!("{g} m/s"),
        None => format!("{NOT_AVAILABLE} m/s"),
    }
}

/// 12-hour clock time in the location's own offset, e.g. "06:53 AM".
pub fn format_local_time(at: Option<DateTime<Utc>>, offset: FixedOffset) -> String {
    match at {
        Some(t) => t.with_timezone(&offset).format("%I:%M %p").to_string(),
        None => MISSING.to_string(),
    }
}

pub fn icon_path(code: Option<&str>) -> Option<String> {
    code.filter(|c| !c.is_empty()).map(|c| format!("icons/{c}.svg"))
}
