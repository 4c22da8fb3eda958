use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::{location::SearchSelection, model::Coordinate};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_API_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
pub const DEFAULT_GEO_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A fixed position standing in for host geolocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// A preset city offered as a one-step pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickCity {
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl QuickCity {
    fn new(title: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            title: title.to_string(),
            latitude,
            longitude,
        }
    }
}

fn default_quick_cities() -> Vec<QuickCity> {
    vec![
        QuickCity::new("London", 51.5074, -0.1278),
        QuickCity::new("Sydney", -33.8688, 151.2093),
        QuickCity::new("Tokyo", 35.6762, 139.6503),
        QuickCity::new("Toronto", 43.6532, -79.3832),
        QuickCity::new("Paris", 48.8566, 2.3522),
    ]
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [home]
/// latitude = 51.5
/// longitude = -0.12
///
/// [[quick_cities]]
/// title = "London"
/// latitude = 51.5074
/// longitude = -0.1278
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub geo_base_url: String,
    pub timeout_secs: u64,
    pub home: Option<HomeLocation>,
    pub quick_cities: Vec<QuickCity>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            geo_base_url: DEFAULT_GEO_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            home: None,
            quick_cities: default_quick_cities(),
        }
    }
}

impl Config {
    /// Load config from the platform location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-insight", "weather-insight")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// API key, with `OPENWEATHER_API_KEY` taking precedence over the file.
    pub fn api_key(&self) -> Option<String> {
        self.api_key_with_override(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_override(&self, env_value: Option<String>) -> Option<String> {
        env_value
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn require_api_key(&self) -> Result<String> {
        self.api_key().ok_or_else(|| {
            anyhow!(
                "No OpenWeather API key configured.\n\
                 Hint: run `weather-insight configure` or set {API_KEY_ENV}."
            )
        })
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn set_home(&mut self, coordinate: Coordinate) {
        self.home = Some(HomeLocation {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
        });
    }

    /// Configured home position, validated.
    pub fn home_coordinate(&self) -> Result<Option<Coordinate>> {
        self.home
            .as_ref()
            .map(|h| Coordinate::new(h.latitude, h.longitude))
            .transpose()
            .context("Home location in config is out of range")
    }

    /// Quick cities as search picks. Out-of-range entries are skipped.
    pub fn quick_picks(&self) -> Vec<SearchSelection> {
        self.quick_cities
            .iter()
            .filter_map(|city| match Coordinate::new(city.latitude, city.longitude) {
                Ok(coordinate) => Some(SearchSelection {
                    coordinate,
                    label: city.title.clone(),
                }),
                Err(e) => {
                    tracing::warn!(title = %city.title, error = %e, "Skipping quick city");
                    None
                }
            })
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}
