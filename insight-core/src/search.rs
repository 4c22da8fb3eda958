//! City autocomplete via the OpenWeather direct geocoding endpoint.
//! Best effort: failures are logged and yield no suggestions.

use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{config::Config, location::SearchSelection, model::Coordinate};

pub const SEARCH_LIMIT: usize = 5;

#[derive(Debug, Deserialize)]
struct GeoCity {
    name: String,
    country: Option<String>,
    lat: f64,
    lon: f64,
}

impl GeoCity {
    fn into_selection(self) -> Option<SearchSelection> {
        let coordinate = Coordinate::new(self.lat, self.lon).ok()?;
        let label = match self.country.filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name,
        };
        Some(SearchSelection { coordinate, label })
    }
}

#[derive(Debug, Clone)]
pub struct CitySearch {
    api_key: String,
    base_url: String,
    http: Client,
}

impl CitySearch {
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?;
        Self::new(api_key, config.geo_base_url.clone(), config.timeout())
            .context("Failed to build geocoding HTTP client")
    }

    /// Up to five matching places for `text`.
    pub async fn search(&self, text: &str) -> Vec<SearchSelection> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let url = format!("{}/geo/1.0/direct", self.base_url);
        let limit = SEARCH_LIMIT.to_string();

        let response = match self
            .http
            .get(&url)
            .query(&[("q", text), ("limit", limit.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("City search request failed: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!("City search returned status {}", response.status());
            return Vec::new();
        }

        let cities: Vec<GeoCity> = match response.json().await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("City search parse error: {}", e);
                return Vec::new();
            }
        };

        let results: Vec<_> = cities
            .into_iter()
            .filter_map(GeoCity::into_selection)
            .take(SEARCH_LIMIT)
            .collect();

        tracing::debug!(query = text, matches = results.len(), "City search done");
        results
    }
}
