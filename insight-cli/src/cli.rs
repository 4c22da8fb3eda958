use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, InquireError, Password, PasswordDisplayMode, Select, Text};
use insight_core::{
    ActiveTab, CitySearch, Config, Coordinate, Coordinator, FixedPosition, GeolocationSource,
    OpenWeatherProvider, SearchSelection, Unavailable, ViewState, resolve_from_search_selection,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-insight", version, about = "Weather dashboard in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and an optional home location.
    Configure,

    /// Show weather for a city, explicit coordinates, or the home location.
    Show {
        /// City to search for; the best match is used.
        city: Option<String>,

        #[arg(long, requires = "lon", conflicts_with = "city", allow_hyphen_values = true)]
        lat: Option<f64>,

        #[arg(long, requires = "lat", conflicts_with = "city", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Show the forecast instead of current conditions.
        #[arg(long)]
        forecast: bool,
    },

    /// List places matching a search text.
    Search {
        text: String,
    },

    /// Interactive dashboard: search, switch tabs, refresh.
    Dashboard,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, lat, lon, forecast } => show(city, lat.zip(lon), forecast).await,
            Command::Search { text } => search(&text).await,
            Command::Dashboard => dashboard().await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = Password::new("OpenWeather API key (leave empty to keep current):")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if !key.trim().is_empty() {
        config.set_api_key(key.trim().to_string());
    }

    let wants_home = Confirm::new("Set a home location used instead of geolocation?")
        .with_default(config.home.is_some())
        .prompt()?;
    if wants_home {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a decimal number")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a decimal number")
            .prompt()?;
        config.set_home(Coordinate::new(latitude, longitude)?);
    } else {
        config.home = None;
    }

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn show(
    city: Option<String>,
    coords: Option<(f64, f64)>,
    forecast: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let coordinator = coordinator(&config)?;

    if forecast {
        coordinator.select_tab(ActiveTab::Forecast);
    }

    match (city, coords) {
        (Some(city), _) => {
            let search = CitySearch::from_config(&config)?;
            let Some(best) = search.search(&city).await.into_iter().next() else {
                bail!("No places match '{city}'");
            };
            tracing::info!(label = %best.label, "Using best search match");
            coordinator.on_search_selected(resolve_from_search_selection(&best)).await;
        }
        (None, Some((lat, lon))) => {
            coordinator.on_location_resolved(Coordinate::new(lat, lon)?).await;
        }
        (None, None) => {
            let source = geolocation(&config)?;
            coordinator.start(source.as_ref()).await;
        }
    }

    let state = coordinator.state();
    print!("{}", render::render(&state));

    if let Some(err) = state.error {
        bail!(err.message);
    }
    Ok(())
}

async fn search(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let search = CitySearch::from_config(&config)?;

    let results = search.search(text).await;
    if results.is_empty() {
        println!("No places match '{text}'");
    }
    for selection in results {
        println!("{:<32} {}", selection.label, selection.coordinate);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Search,
    YourLocation(Coordinate),
    QuickCity(SearchSelection),
    SwitchTab(ActiveTab),
    Refresh,
    Quit,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Search => f.write_str("Search for a city"),
            Action::YourLocation(_) => f.write_str("Your Location"),
            Action::QuickCity(city) => f.write_str(&city.label),
            Action::SwitchTab(ActiveTab::Current) => f.write_str("Show current weather"),
            Action::SwitchTab(ActiveTab::Forecast) => f.write_str("Show 7-day forecast"),
            Action::Refresh => f.write_str("Refresh"),
            Action::Quit => f.write_str("Quit"),
        }
    }
}

/// Dashboard menu. "Your Location" only appears once a position is known.
fn menu(state: &ViewState, quick_picks: &[SearchSelection]) -> Vec<Action> {
    let mut actions = vec![Action::Search];
    if let Some(coordinate) = state.last_known_location {
        actions.push(Action::YourLocation(coordinate));
    }
    actions.extend(quick_picks.iter().cloned().map(Action::QuickCity));
    actions.extend([
        Action::SwitchTab(state.active_tab.toggled()),
        Action::Refresh,
        Action::Quit,
    ]);
    actions
}

async fn dashboard() -> anyhow::Result<()> {
    let config = Config::load()?;
    let coordinator = coordinator(&config)?;
    let search = CitySearch::from_config(&config)?;
    let quick_picks = config.quick_picks();

    let mut updates = coordinator.subscribe();
    let indicator = tokio::spawn(async move {
        let mut was_loading = false;
        while updates.changed().await.is_ok() {
            let loading = updates.borrow_and_update().is_loading;
            if loading && !was_loading {
                eprintln!("Loading...");
            }
            was_loading = loading;
        }
    });

    let source = geolocation(&config)?;
    coordinator.start(source.as_ref()).await;
    print!("{}", render::render(&coordinator.state()));

    loop {
        let actions = menu(&coordinator.state(), &quick_picks);

        let action = match Select::new("What next?", actions).prompt() {
            Ok(action) => action,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        match action {
            Action::Search => {
                let Some(selection) = pick_city(&search).await? else {
                    continue;
                };
                coordinator.on_search_selected(resolve_from_search_selection(&selection)).await;
            }
            Action::YourLocation(coordinate) => coordinator.on_location_resolved(coordinate).await,
            Action::QuickCity(city) => {
                coordinator.on_search_selected(resolve_from_search_selection(&city)).await;
            }
            Action::SwitchTab(tab) => coordinator.select_tab(tab),
            Action::Refresh => coordinator.refresh().await,
            Action::Quit => break,
        }

        print!("{}", render::render(&coordinator.state()));
    }

    coordinator.shutdown();
    indicator.abort();
    Ok(())
}

/// Ask for a search text and let the user pick one of the matches.
async fn pick_city(search: &CitySearch) -> anyhow::Result<Option<SearchSelection>> {
    let text = match Text::new("Search for a city:").prompt() {
        Ok(text) => text,
        Err(InquireError::OperationCanceled) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut results = search.search(&text).await;
    if results.is_empty() {
        println!("No places match '{}'", text.trim());
        return Ok(None);
    }

    let labels: Vec<String> = results.iter().map(|s| s.label.clone()).collect();
    let picked = match Select::new("Pick a place:", labels).raw_prompt() {
        Ok(picked) => picked.index,
        Err(InquireError::OperationCanceled) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(results.swap_remove(picked)))
}

fn coordinator(config: &Config) -> anyhow::Result<Coordinator> {
    let provider = OpenWeatherProvider::from_config(config)?;
    Ok(Coordinator::new(Arc::new(provider)))
}

/// The configured home position stands in for host geolocation.
fn geolocation(config: &Config) -> anyhow::Result<Box<dyn GeolocationSource>> {
    let home = config.home_coordinate().context("Cannot use configured home location")?;
    Ok(match home {
        Some(coordinate) => Box::new(FixedPosition::new(coordinate)),
        None => Box::new(Unavailable),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picks() -> Vec<SearchSelection> {
        vec![SearchSelection {
            coordinate: Coordinate::new(35.6762, 139.6503).expect("valid"),
            label: "Tokyo".into(),
        }]
    }

    #[test]
    fn menu_hides_your_location_until_known() {
        let actions = menu(&ViewState::default(), &picks());

        assert!(!actions.iter().any(|a| matches!(a, Action::YourLocation(_))));
        assert_eq!(actions[1].to_string(), "Tokyo");
        assert_eq!(actions.last(), Some(&Action::Quit));
    }

    #[test]
    fn menu_offers_your_location_once_known() {
        let here = Coordinate::new(40.0, -74.0).expect("valid");
        let state = ViewState {
            last_known_location: Some(here),
            active_tab: ActiveTab::Forecast,
            ..Default::default()
        };
        let actions = menu(&state, &picks());

        assert_eq!(actions[1], Action::YourLocation(here));
        assert_eq!(actions[1].to_string(), "Your Location");
        assert!(actions.contains(&Action::SwitchTab(ActiveTab::Current)));
    }
}
