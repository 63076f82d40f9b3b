//! End-to-end tests of the web surface: browser request → agent → SERP tool.
#![cfg(feature = "server")]

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use weather_chat::{
    server, weather_tools, AgentConfig, Role, SearchConfig, StubModel, WeatherAssistant,
    WeatherLookup,
};
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn(assistant: Arc<WeatherAssistant<StubModel>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        server::serve_on(listener, assistant).await.unwrap();
    });
    format!("http://{addr}")
}

fn assistant_with(model: Arc<StubModel>, search: SearchConfig) -> Arc<WeatherAssistant<StubModel>> {
    let lookup = WeatherLookup::new(&search).unwrap();
    Arc::new(WeatherAssistant::new(
        model,
        weather_tools(lookup),
        AgentConfig::default(),
    ))
}

#[tokio::test]
async fn serves_the_page() {
    let base = spawn(assistant_with(StubModel::new(vec![]), SearchConfig::default())).await;

    let page = reqwest::get(format!("{base}/")).await.unwrap().text().await.unwrap();

    assert!(page.contains("<h1>Live Weather Chatbot</h1>"));
    assert!(page.contains("Enter your weather query:"));
    assert!(page.contains("Get Weather"));
    assert!(page.contains("Fetching live weather information..."));

    let health = reqwest::get(format!("{base}/health")).await.unwrap().text().await.unwrap();
    assert_eq!(health, "ok");
}

#[tokio::test]
async fn blank_queries_never_reach_the_agent() {
    let model = StubModel::new(vec![]);
    let base = spawn(assistant_with(model.clone(), SearchConfig::default())).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/ask"))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
    assert!(model.requests().is_empty());
}

#[tokio::test]
async fn answers_through_the_weather_tool() {
    let serp = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("q", "weather in Pittsburgh today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organic_results": [{"rich_snippet": {"top": {"extensions": ["72°F", "Partly cloudy"]}}}]
        })))
        .expect(1)
        .mount(&serp)
        .await;

    let model = StubModel::new(vec![
        r#"{"action":"call_tool","name":"SERPWeatherAPI","arguments":{"query":"weather in Pittsburgh today"}}"#.into(),
        "Final Answer: 72°F and partly cloudy in Pittsburgh today.".into(),
        "Final Answer: Same as before.".into(),
    ]);
    let search = SearchConfig {
        endpoint: format!("{}/search", serp.uri()),
        api_key: Some("serp-test-key".into()),
        ..SearchConfig::default()
    };
    let assistant = assistant_with(model.clone(), search);
    let base = spawn(Arc::clone(&assistant)).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base}/api/ask"))
        .json(&json!({"query": "What does the weather look like in Pittsburgh today?"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["answer"], "72°F and partly cloudy in Pittsburgh today.");
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let transcript = assistant.transcript(&session_id).await;
    let tool_output = transcript.iter().find(|m| m.role == Role::Tool).unwrap();
    assert_eq!(tool_output.content, "72°F Partly cloudy");

    let res = client
        .post(format!("{base}/api/ask"))
        .json(&json!({"query": "And tomorrow?", "session_id": session_id}))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["answer"], "Same as before.");

    let last_request = model.requests().pop().unwrap();
    assert!(last_request
        .iter()
        .any(|m| m.content == "What does the weather look like in Pittsburgh today?"));
}

#[tokio::test]
async fn agent_failures_are_reported_as_bad_gateway() {
    let base = spawn(assistant_with(StubModel::new(vec![]), SearchConfig::default())).await;

    let res = reqwest::Client::new()
        .post(format!("{base}/api/ask"))
        .json(&json!({"query": "weather in Pittsburgh", "session_id": "s-1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("scripted responses"));
    assert_eq!(body["session_id"], "s-1");
}
