//! Tools the weather assistant can hand to its agent.
//!
//! - SERP weather: live forecast lookup through the Scale SERP API

pub mod serp_weather;

pub use serp_weather::{SerpWeatherTool, SERP_WEATHER_TOOL_NAME};
