//! Core library for Weather Insight.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Location resolution (host geolocation, city search)
//! - The OpenWeather provider
//! - The view-state coordinator that fetches, validates and publishes weather
//! - Display helpers shared by front-ends
//!
//! It is used by `insight-cli`, but can also back other front-ends.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod search;
pub mod view;

pub use config::Config;
pub use coordinator::Coordinator;
pub use error::{ErrorKind, ResolutionError, WeatherError};
pub use location::{
    FixedPosition, GeolocationSource, SearchSelection, Unavailable, resolve_current_location,
    resolve_from_search_selection,
};
pub use model::{
    ActiveTab, Coordinate, CurrentConditions, ErrorInfo, ForecastSeries, LocationQuery, ViewState,
    WeatherSnapshot,
};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use search::CitySearch;
pub use view::Theme;
