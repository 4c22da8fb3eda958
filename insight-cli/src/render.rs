//! Text rendering of [`ViewState`] as the dashboard cards.

use std::fmt::Write;

use chrono::Local;
use insight_core::{
    ActiveTab, Theme, ViewState, WeatherSnapshot,
    view::{
        format_humidity, format_local_time, format_pressure, format_temperature,
        format_visibility, format_wind_gust, format_wind_speed, icon_path,
    },
};

const EMPTY_HINT: &str =
    "Search for a city or configure a home location to view weather details.";

pub fn render(state: &ViewState) -> String {
    let mut out = String::new();
    let theme = Theme::for_state(state);

    let _ = writeln!(out, "== Weather Insight [{}] ==", theme.name());

    if let Some(err) = &state.error {
        let _ = writeln!(out, "! {}", err.message);
    }
    if state.is_loading {
        let _ = writeln!(out, "Loading...");
    }

    match state.displayable() {
        Some(snapshot) => {
            let fetched = snapshot.fetched_at.with_timezone(&Local);
            let _ = writeln!(out, "Last updated: {}", fetched.format("%H:%M:%S"));
            out.push('\n');
            match state.active_tab {
                ActiveTab::Current => render_current(&mut out, snapshot),
                ActiveTab::Forecast => render_forecast(&mut out, snapshot),
            }
        }
        None if state.snapshot.is_none() && !state.is_loading && state.error.is_none() => {
            let _ = writeln!(out, "{EMPTY_HINT}");
        }
        None => {}
    }

    out
}

fn render_current(out: &mut String, snapshot: &WeatherSnapshot) {
    let current = &snapshot.current;
    let condition = &current.condition;
    let offset = current.local_offset();

    let description = condition
        .description
        .as_deref()
        .map(capitalize)
        .unwrap_or_else(|| "No description".to_string());

    let _ = writeln!(out, "@ {}", snapshot.city);
    let _ = write!(out, "  {}  {}", format_temperature(Some(current.temperature_c)), description);
    if let Some(icon) = icon_path(condition.icon.as_deref()) {
        let _ = write!(out, "  ({icon})");
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "  Feels like {} | Humidity {} | Wind {}",
        format_temperature(current.feels_like_c),
        format_humidity(current.humidity_pct),
        format_wind_speed(current.wind_speed_mps),
    );
    out.push('\n');

    let cards = [
        ("Sunrise", format_local_time(current.sunrise, offset)),
        ("Sunset", format_local_time(current.sunset, offset)),
        ("High", format_temperature(current.temp_max_c)),
        ("Low", format_temperature(current.temp_min_c)),
        ("Pressure", format_pressure(current.pressure_hpa)),
        ("Visibility", format_visibility(current.visibility_m)),
        ("Wind Gust", format_wind_gust(current.wind_gust_mps)),
    ];
    for (label, value) in cards {
        let _ = writeln!(out, "  {label:<11}{value}");
    }
}

fn render_forecast(out: &mut String, snapshot: &WeatherSnapshot) {
    let _ = writeln!(out, "7-Day Forecast - {}", snapshot.city);

    if snapshot.forecast.is_empty() {
        let _ = writeln!(out, "  No forecast data");
        return;
    }

    for day in snapshot.forecast.daily() {
        let summary = day
            .condition
            .description
            .as_deref()
            .or(day.condition.main.as_deref())
            .map(capitalize)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {}  {:>5} / {:<5}  {}",
            day.date.format("%a %d %b"),
            format_temperature(Some(day.low_c)),
            format_temperature(Some(day.high_c)),
            summary,
        );
    }
}

fn capitalize(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
