//! Live weather lookup through the Scale SERP API.
//!
//! A lookup issues one search request and turns whatever comes back into
//! text the agent can read. The forecast is picked from the first organic
//! result, in a fixed order:
//!
//! 1. `rich_snippet.top.extensions`, space-joined, when it mentions `°F`;
//! 2. the result's `snippet`, when it mentions `°F`;
//! 3. the whole response, pretty-printed.
//!
//! Transport failures, non-200 statuses and unreadable bodies are rendered
//! as error text instead of being returned as `Err`, because the only
//! consumer is a language model that reads text.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::SearchConfig;
use crate::error::{Result, WeatherChatError};

/// Marker a fragment must contain to count as a temperature reading.
pub const FAHRENHEIT_MARKER: &str = "°F";

/// Typed view over the parts of a SERP response the extraction reads.
///
/// Every field is optional, and a field holding JSON of the wrong shape is
/// read as absent rather than failing the whole response. Results stay raw
/// until read so one malformed entry does not hide the others.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SearchResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub organic_results: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OrganicResult {
    #[serde(default, deserialize_with = "lenient")]
    pub rich_snippet: Option<RichSnippet>,
    #[serde(default, deserialize_with = "lenient")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RichSnippet {
    #[serde(default, deserialize_with = "lenient")]
    pub top: Option<RichSnippetTop>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RichSnippetTop {
    #[serde(default, deserialize_with = "lenient")]
    pub extensions: Option<Vec<String>>,
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

impl SearchResponse {
    /// Read the typed view out of a parsed body. Non-object bodies have no results.
    pub fn from_value(raw: &Value) -> Self {
        if !raw.is_object() {
            return Self::default();
        }
        Self::deserialize(raw).unwrap_or_default()
    }

    pub fn first_result(&self) -> Option<OrganicResult> {
        let first = self.organic_results.as_ref()?.first()?;
        OrganicResult::deserialize(first).ok()
    }
}

impl OrganicResult {
    /// Space-joined rich snippet extensions, if there are any.
    pub fn joined_extensions(&self) -> Option<String> {
        let extensions = self
            .rich_snippet
            .as_ref()?
            .top
            .as_ref()?
            .extensions
            .as_ref()?;
        if extensions.is_empty() {
            return None;
        }
        Some(extensions.join(" "))
    }
}

/// Why a lookup produced no forecast. The display text is what the agent sees.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("Error: Unable to reach SERP API: {0}")]
    Transport(String),

    #[error("Error: Unable to fetch data from SERP API, status code: {0}")]
    UpstreamStatus(u16),

    #[error("Error: Unable to parse SERP API response: {0}")]
    Parse(String),
}

/// Outcome of one lookup, tagged with where the text came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Forecast {
    Extensions(String),
    Snippet(String),
    RawDump(String),
    Unavailable(LookupError),
}

impl Forecast {
    pub fn source(&self) -> &'static str {
        match self {
            Forecast::Extensions(_) => "extensions",
            Forecast::Snippet(_) => "snippet",
            Forecast::RawDump(_) => "raw_dump",
            Forecast::Unavailable(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Forecast::Unavailable(_))
    }

    pub fn into_text(self) -> String {
        match self {
            Forecast::Extensions(text) | Forecast::Snippet(text) | Forecast::RawDump(text) => text,
            Forecast::Unavailable(err) => err.to_string(),
        }
    }
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Forecast::Extensions(text) | Forecast::Snippet(text) | Forecast::RawDump(text) => {
                f.write_str(text)
            }
            Forecast::Unavailable(err) => write!(f, "{err}"),
        }
    }
}

/// Pick the forecast text out of a parsed SERP response.
pub fn extract_forecast(raw: &Value) -> Forecast {
    let response = SearchResponse::from_value(raw);

    if let Some(first) = response.first_result() {
        if let Some(joined) = first.joined_extensions() {
            if joined.contains(FAHRENHEIT_MARKER) {
                return Forecast::Extensions(joined);
            }
        }
        if let Some(snippet) = first.snippet.as_deref() {
            if snippet.contains(FAHRENHEIT_MARKER) {
                return Forecast::Snippet(snippet.to_string());
            }
        }
    }

    let dump = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
    Forecast::RawDump(dump)
}

/// Client for weather searches. Cheap to clone.
#[derive(Clone, Debug)]
pub struct WeatherLookup {
    http: reqwest::Client,
    config: SearchConfig,
}

impl WeatherLookup {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| WeatherChatError::Config(format!("http client error: {err}")))?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    /// Search for `query` and extract a forecast. Never fails; errors become text.
    #[instrument(skip(self), fields(endpoint = %self.config.endpoint))]
    pub async fn lookup(&self, query: &str) -> Forecast {
        let forecast = match self.fetch(query).await {
            Ok(raw) => extract_forecast(&raw),
            Err(err) => {
                warn!(error = %err, "weather lookup failed");
                Forecast::Unavailable(err)
            }
        };
        debug!(source = forecast.source(), "weather lookup finished");
        forecast
    }

    /// Same as [`WeatherLookup::lookup`], rendered to text.
    pub async fn forecast_text(&self, query: &str) -> String {
        self.lookup(query).await.into_text()
    }

    fn query_params<'a>(&'a self, query: &'a str) -> [(&'static str, &'a str); 6] {
        [
            ("api_key", self.config.api_key.as_deref().unwrap_or_default()),
            ("q", query),
            ("gl", self.config.region.as_str()),
            ("hl", self.config.language.as_str()),
            ("google_domain", self.config.google_domain.as_str()),
            (
                "include_ai_overview",
                if self.config.include_ai_overview {
                    "true"
                } else {
                    "false"
                },
            ),
        ]
    }

    async fn fetch(&self, query: &str) -> std::result::Result<Value, LookupError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&self.query_params(query))
            .send()
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;

        let status = response.status();
        debug!(status = %status, "received SERP response");
        if status != reqwest::StatusCode::OK {
            return Err(LookupError::UpstreamStatus(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|err| LookupError::Transport(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| LookupError::Parse(err.to_string()))
    }
}
