//! End-to-end tests for the OpenWeather provider, city search and the
//! coordinator, run against a wiremock server.

use std::{sync::Arc, time::Duration};

use insight_core::{
    CitySearch, Coordinate, Coordinator, ErrorKind, LocationQuery, OpenWeatherProvider, Theme,
    view::format_temperature,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const KEY: &str = "TEST_KEY";

fn london_current() -> serde_json::Value {
    serde_json::json!({
        "cod": 200,
        "name": "London",
        "main": {
            "temp": 15,
            "feels_like": 14,
            "humidity": 70,
            "pressure": 1012,
            "temp_min": 13,
            "temp_max": 17
        },
        "wind": { "speed": 5 },
        "sys": { "sunrise": 1_700_000_000, "sunset": 1_700_040_000 },
        "weather": [ { "description": "clear sky", "icon": "01d", "main": "Clear" } ],
        "visibility": 10000,
        "timezone": 0
    })
}

fn london_forecast() -> serde_json::Value {
    serde_json::json!({
        "cod": "200",
        "message": 0,
        "cnt": 2,
        "city": { "name": "London", "timezone": 0 },
        "list": [
            {
                "dt": 1_700_006_400,
                "main": { "temp": 11.2, "temp_min": 10.1, "temp_max": 11.9, "humidity": 81 },
                "wind": { "speed": 4.1, "gust": 7.3 },
                "weather": [ { "description": "light rain", "icon": "10n", "main": "Rain" } ],
                "visibility": 9000
            },
            {
                "dt": 1_700_017_200,
                "main": { "temp": 9.8 },
                "weather": [ { "description": "few clouds", "icon": "02n", "main": "Clouds" } ]
            }
        ]
    })
}

fn london() -> LocationQuery {
    LocationQuery::new(Coordinate::new(51.5, -0.12).expect("valid"), Some("London, GB".into()))
}

fn coordinator_for(server: &MockServer) -> Coordinator {
    #[allow(clippy::expect_used)]
    let provider = OpenWeatherProvider::new(KEY.into(), server.uri(), Duration::from_secs(5))
        .expect("Failed to create provider");
    Coordinator::new(Arc::new(provider))
}

async fn mount(server: &MockServer, endpoint: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param("appid", KEY))
        .and(query_param("units", "metric"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_london(server: &MockServer) {
    mount(server, "/weather", ResponseTemplate::new(200).set_body_json(london_current())).await;
    mount(server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;
}

// ============================================================================
// Success scenarios
// ============================================================================

#[tokio::test]
async fn test_london_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "51.5"))
        .and(query_param("lon", "-0.12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(london_current()))
        .expect(1)
        .mount(&server)
        .await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert!(!state.is_loading);
    assert!(state.error.is_none());

    let snapshot = state.snapshot.expect("snapshot published");
    assert_eq!(snapshot.city, "London");
    assert_eq!(format_temperature(Some(snapshot.current.temperature_c)), "15°C");
    assert_eq!(Theme::for_snapshot(Some(&snapshot)), Theme::Clear);
    assert_eq!(snapshot.current.humidity_pct, Some(70));
    assert!(snapshot.current.wind_gust_mps.is_none());

    assert_eq!(snapshot.forecast.entries.len(), 2);
    assert_eq!(snapshot.forecast.entries[0].wind_gust_mps, Some(7.3));
    assert_eq!(snapshot.forecast.daily().len(), 1);
}

#[tokio::test]
async fn test_label_used_when_provider_name_missing() {
    let server = MockServer::start().await;
    let mut current = london_current();
    current["name"] = serde_json::json!("");
    mount(&server, "/weather", ResponseTemplate::new(200).set_body_json(current)).await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    assert_eq!(coordinator.state().snapshot.expect("snapshot").city, "London, GB");
}

// ============================================================================
// Failure scenarios
// ============================================================================

#[tokio::test]
async fn test_city_not_found_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_london(&server).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;
    let before = coordinator.state().snapshot;
    assert!(before.is_some());

    server.reset().await;
    mount(
        &server,
        "/weather",
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({ "cod": 404, "message": "city not found" })),
    )
    .await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert_eq!(state.error.as_ref().expect("error").message, "city not found");
    assert_eq!(state.error.expect("error").kind, ErrorKind::Provider);
    assert_eq!(state.snapshot, before);
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_forecast_numeric_code_is_not_success() {
    let server = MockServer::start().await;
    let mut forecast = london_forecast();
    forecast["cod"] = serde_json::json!(200);
    mount(&server, "/weather", ResponseTemplate::new(200).set_body_json(london_current())).await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(forecast)).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert!(state.snapshot.is_none());
    assert_eq!(state.error.expect("error").message, "Failed to fetch weather data");
}

#[tokio::test]
async fn test_non_json_server_error() {
    let server = MockServer::start().await;
    mount(&server, "/weather", ResponseTemplate::new(502).set_body_string("Bad Gateway")).await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let error = coordinator.state().error.expect("error");
    assert_eq!(error.kind, ErrorKind::Provider);
    assert!(error.message.contains("502"));
    assert!(error.message.contains("Bad Gateway"));
}

#[tokio::test]
async fn test_non_json_success_body_is_malformed() {
    let server = MockServer::start().await;
    mount(&server, "/weather", ResponseTemplate::new(200).set_body_string("<html>ok</html>")).await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert_eq!(state.error.expect("error").kind, ErrorKind::MalformedResponse);
    assert!(state.snapshot.is_none());
    assert!(!state.is_loading);
}

#[tokio::test]
async fn test_current_error_preferred_when_both_fail() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/weather",
        ResponseTemplate::new(404)
            .set_body_json(serde_json::json!({ "cod": 404, "message": "city not found" }))
            .set_delay(Duration::from_millis(200)),
    )
    .await;
    mount(
        &server,
        "/forecast",
        ResponseTemplate::new(401)
            .set_body_json(serde_json::json!({ "cod": 401, "message": "Invalid API key" })),
    )
    .await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert_eq!(state.error.expect("error").message, "city not found");
    assert!(state.snapshot.is_none());
}

#[tokio::test]
async fn test_missing_temperature_is_malformed() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/weather",
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "cod": 200, "name": "London", "main": {} })),
    )
    .await;
    mount(&server, "/forecast", ResponseTemplate::new(200).set_body_json(london_forecast())).await;

    let coordinator = coordinator_for(&server);
    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert_eq!(state.error.expect("error").kind, ErrorKind::MalformedResponse);
    assert!(state.snapshot.is_none());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    #[allow(clippy::expect_used)]
    let provider =
        OpenWeatherProvider::new(KEY.into(), "http://127.0.0.1:1", Duration::from_secs(2))
            .expect("Failed to create provider");
    let coordinator = Coordinator::new(Arc::new(provider));

    coordinator.load_weather(london()).await;

    let state = coordinator.state();
    assert_eq!(state.error.expect("error").kind, ErrorKind::Network);
    assert!(!state.is_loading);
}

// ============================================================================
// City search
// ============================================================================

#[tokio::test]
async fn test_city_search_maps_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "London"))
        .and(query_param("limit", "5"))
        .and(query_param("appid", KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "name": "London", "country": "GB", "lat": 51.5073, "lon": -0.1276 },
            { "name": "London", "country": "CA", "lat": 42.9832, "lon": -81.2433 },
            { "name": "Broken", "country": "XX", "lat": 999.0, "lon": 0.0 }
        ])))
        .mount(&server)
        .await;

    #[allow(clippy::expect_used)]
    let search = CitySearch::new(KEY.into(), server.uri(), Duration::from_secs(5))
        .expect("Failed to create search client");
    let results = search.search("London").await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].label, "London, GB");
    assert_eq!(results[1].label, "London, CA");
    assert_eq!(results[1].coordinate.latitude(), 42.9832);
}

#[tokio::test]
async fn test_city_search_failure_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "cod": 401, "message": "Invalid API key" })),
        )
        .mount(&server)
        .await;

    #[allow(clippy::expect_used)]
    let search = CitySearch::new(KEY.into(), server.uri(), Duration::from_secs(5))
        .expect("Failed to create search client");

    assert!(search.search("London").await.is_empty());
}
