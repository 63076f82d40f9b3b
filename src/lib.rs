//! A conversational weather assistant.
//!
//! The crate provides:
//! - A live weather lookup against the Scale SERP API (`WeatherLookup`).
//! - A tool interface (`Tool` and `ToolRegistry`) with the SERP weather tool.
//! - An `Agent` that loops between a chat model (`LanguageModel`) and its tools.
//! - A one-page web UI serving the assistant (`server`, behind the `server` feature).

mod agent;
mod assistant;
mod config;
mod error;
mod llm;
mod memory;
mod message;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
mod tool;
pub mod tools;
pub mod weather;

pub use agent::{extract_final_answer, Agent, FINAL_ANSWER_MARKER};
pub use assistant::{weather_tools, WeatherAssistant, WEATHER_SYSTEM_PROMPT};
pub use config::{AgentConfig, AppConfig, LoggingConfig, ModelConfig, SearchConfig, ServerConfig};
pub use error::{Result, WeatherChatError};
pub use llm::{LanguageModel, ModelCompletion, OpenAIClient, StubModel};
pub use memory::{ConversationMemory, FullMemoryStrategy, MemoryStrategy, WindowedMemoryStrategy};
pub use message::{Message, Role, ToolCall, ToolResult};
pub use tool::{Tool, ToolDescription, ToolRegistry};
pub use tools::SerpWeatherTool;
pub use weather::{extract_forecast, Forecast, LookupError, WeatherLookup};
