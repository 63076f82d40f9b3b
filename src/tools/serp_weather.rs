//! Weather search tool backed by the Scale SERP API.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{Result, WeatherChatError};
use crate::tool::Tool;
use crate::weather::WeatherLookup;

pub const SERP_WEATHER_TOOL_NAME: &str = "SERPWeatherAPI";

const SERP_WEATHER_DESCRIPTION: &str = "Retrieves live weather information using the Scale SERP API based on a user-provided query. \
Use this tool when the user asks about weather forecasts, and include detailed temperature data if available.";

/// Exposes [`WeatherLookup`] to the agent. Expects `{"query": string}`.
#[derive(Clone, Debug)]
pub struct SerpWeatherTool {
    lookup: WeatherLookup,
}

impl SerpWeatherTool {
    pub fn new(lookup: WeatherLookup) -> Self {
        Self { lookup }
    }

    /// Run the lookup for `query` exactly as given.
    pub async fn invoke(&self, query: &str) -> String {
        self.lookup.forecast_text(query).await
    }
}

#[async_trait]
impl Tool for SerpWeatherTool {
    fn name(&self) -> &str {
        SERP_WEATHER_TOOL_NAME
    }

    fn description(&self) -> &str {
        SERP_WEATHER_DESCRIPTION
    }

    fn parameters(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query including the location and the day(s) of interest"
                }
            },
            "required": ["query"]
        }))
    }

    async fn call(&self, input: Value) -> Result<Value> {
        let query = match &input {
            Value::String(query) => query.as_str(),
            other => other.get("query").and_then(Value::as_str).ok_or_else(|| {
                WeatherChatError::Protocol(format!(
                    "missing `query` for {SERP_WEATHER_TOOL_NAME}"
                ))
            })?,
        };

        info!(tool = SERP_WEATHER_TOOL_NAME, query, "looking up weather");
        Ok(Value::String(self.invoke(query).await))
    }
}
