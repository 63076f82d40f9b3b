use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeatherChatError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8501
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            organization: None,
            temperature: default_temperature(),
            timeout_secs: default_model_timeout(),
        }
    }
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-3.5-turbo".into()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_model_timeout() -> u64 {
    60
}

/// Scale SERP request settings. Everything except `api_key` and `q` is
/// sent verbatim on every lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Geolocation code (`gl`).
    #[serde(default = "default_region")]
    pub region: String,
    /// Interface language (`hl`).
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_google_domain")]
    pub google_domain: String,
    #[serde(default = "default_include_ai_overview")]
    pub include_ai_overview: bool,
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key: None,
            region: default_region(),
            language: default_language(),
            google_domain: default_google_domain(),
            include_ai_overview: default_include_ai_overview(),
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://api.scaleserp.com/search".into()
}

fn default_region() -> String {
    "us".into()
}

fn default_language() -> String {
    "en".into()
}

fn default_google_domain() -> String {
    "google.com".into()
}

fn default_include_ai_overview() -> bool {
    true
}

fn default_search_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Number of most recent messages sent to the model; `None` sends the whole session.
    #[serde(default)]
    pub memory_window: Option<usize>,
    /// Most conversations kept at once; the least recently used is dropped first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Conversations untouched for this long are forgotten.
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            memory_window: None,
            max_sessions: default_max_sessions(),
            session_idle_secs: default_session_idle(),
        }
    }
}

fn default_max_steps() -> usize {
    15
}

fn default_max_sessions() -> usize {
    1000
}

fn default_session_idle() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let cfg: Self = toml::from_str(&raw).map_err(|err| {
            WeatherChatError::Config(format!("Failed to parse configuration: {err}"))
        })?;
        Ok(cfg)
    }

    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_env_or_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut cfg = Self::from_file(path)?;
        cfg.apply_overrides(|key| env::var(key).ok())?;
        Ok(cfg)
    }

    /// Overlay values looked up by variable name. Empty values are ignored;
    /// values that do not parse are rejected.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = var("SERP_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(host) = var("WEATHER_CHAT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("WEATHER_CHAT_PORT") {
            self.server.port = port.trim().parse::<u16>().map_err(|err| {
                WeatherChatError::Config(format!("invalid WEATHER_CHAT_PORT `{port}`: {err}"))
            })?;
        }
        if let Some(model) = var("WEATHER_CHAT_MODEL") {
            self.model.model = model;
        }
        if let Some(endpoint) = var("WEATHER_CHAT_OPENAI_ENDPOINT") {
            self.model.base_url = Some(endpoint);
        }
        if let Some(endpoint) = var("WEATHER_CHAT_SERP_ENDPOINT") {
            self.search.endpoint = endpoint;
        }
        if let Some(filter) = var("WEATHER_CHAT_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// Check everything a request would otherwise trip over later.
    pub fn validate(&self) -> Result<()> {
        if self.model.provider != "openai" {
            return Err(WeatherChatError::Config(format!(
                "unsupported model provider `{}`",
                self.model.provider
            )));
        }
        if self.model.api_key.is_none() {
            return Err(WeatherChatError::Config(
                "missing language model API key (set OPENAI_API_KEY)".into(),
            ));
        }
        if self.search.api_key.is_none() {
            return Err(WeatherChatError::Config(
                "missing search API key (set SERP_API_KEY)".into(),
            ));
        }
        if self.server.port == 0 {
            return Err(WeatherChatError::Config("server.port must be non-zero".into()));
        }
        if self.search.timeout_secs == 0 || self.model.timeout_secs == 0 {
            return Err(WeatherChatError::Config(
                "timeouts must be greater than 0".into(),
            ));
        }
        if self.agent.max_steps == 0 {
            return Err(WeatherChatError::Config(
                "agent.max_steps must be greater than 0".into(),
            ));
        }
        if self.agent.max_sessions == 0 || self.agent.session_idle_secs == 0 {
            return Err(WeatherChatError::Config(
                "agent session limits must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
