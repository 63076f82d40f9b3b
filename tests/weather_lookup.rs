//! HTTP-level tests for the SERP weather lookup and its tool, against a
//! mocked Scale SERP endpoint.

use std::time::Duration;

use serde_json::{json, Value};
use weather_chat::{Forecast, LookupError, SearchConfig, SerpWeatherTool, Tool, WeatherLookup};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> SearchConfig {
    SearchConfig {
        endpoint: format!("{}/search", server.uri()),
        api_key: Some("serp-test-key".into()),
        timeout_secs: 5,
        ..SearchConfig::default()
    }
}

async fn mount_json(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_the_fixed_search_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("api_key", "serp-test-key"))
        .and(query_param("q", "weather in Pittsburgh today"))
        .and(query_param("gl", "us"))
        .and(query_param("hl", "en"))
        .and(query_param("google_domain", "google.com"))
        .and(query_param("include_ai_overview", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [{"snippet": "Currently 68°F and clear."}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();

    assert_eq!(
        lookup.forecast_text("weather in Pittsburgh today").await,
        "Currently 68°F and clear."
    );
}

#[tokio::test]
async fn prefers_rich_snippet_extensions() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        json!({
            "organic_results": [{
                "rich_snippet": {"top": {"extensions": ["72°F", "Partly cloudy"]}},
                "snippet": "Currently 68°F and clear."
            }]
        }),
    )
    .await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();

    assert_eq!(
        lookup.lookup("weather in Pittsburgh today").await,
        Forecast::Extensions("72°F Partly cloudy".into())
    );
}

#[tokio::test]
async fn dumps_the_response_when_no_temperature_is_found() {
    let server = MockServer::start().await;
    let body = json!({
        "search_metadata": {"engine": "google"},
        "organic_results": [{"title": "Pittsburgh, PA", "snippet": "Forecast for the week"}]
    });
    mount_json(&server, body.clone()).await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();
    let text = lookup.forecast_text("pittsburgh weather").await;

    let reparsed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reparsed, body);
}

#[tokio::test]
async fn reports_upstream_status_without_parsing_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("{\"organic_results\": [{\"snippet\": \"70°F\"}]}"))
        .expect(1)
        .mount(&server)
        .await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();

    assert_eq!(
        lookup.forecast_text("weather").await,
        "Error: Unable to fetch data from SERP API, status code: 503"
    );
}

#[tokio::test]
async fn unauthorized_is_just_another_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();

    assert_eq!(
        lookup.lookup("weather").await,
        Forecast::Unavailable(LookupError::UpstreamStatus(401))
    );
}

#[tokio::test]
async fn malformed_bodies_become_error_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let lookup = WeatherLookup::new(&config_for(&server)).unwrap();
    let forecast = lookup.lookup("weather").await;

    assert!(matches!(forecast, Forecast::Unavailable(LookupError::Parse(_))));
    assert!(forecast
        .into_text()
        .starts_with("Error: Unable to parse SERP API response"));
}

#[tokio::test]
async fn slow_upstream_times_out_as_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = SearchConfig {
        timeout_secs: 1,
        ..config_for(&server)
    };
    let lookup = WeatherLookup::new(&config).unwrap();

    assert!(matches!(
        lookup.lookup("weather").await,
        Forecast::Unavailable(LookupError::Transport(_))
    ));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let config = SearchConfig {
        endpoint: "http://127.0.0.1:1/search".into(),
        timeout_secs: 2,
        ..SearchConfig::default()
    };
    let lookup = WeatherLookup::new(&config).unwrap();

    let text = lookup.forecast_text("weather").await;

    assert!(text.starts_with("Error: Unable to reach SERP API"));
}

#[tokio::test]
async fn tool_passes_the_query_through_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "  Pittsburgh next 4 days  "))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [{"rich_snippet": {"top": {"extensions": ["Mon 70°F", "Tue 65°F"]}}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tool = SerpWeatherTool::new(WeatherLookup::new(&config_for(&server)).unwrap());

    assert_eq!(tool.invoke("  Pittsburgh next 4 days  ").await, "Mon 70°F Tue 65°F");
    let output = tool
        .call(json!({"query": "  Pittsburgh next 4 days  "}))
        .await
        .unwrap();
    assert_eq!(output, json!("Mon 70°F Tue 65°F"));
}
