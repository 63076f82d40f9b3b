use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use weather_chat::{server, telemetry, AppConfig, OpenAIClient, WeatherAssistant, WeatherChatError};

const CONFIG_PATH_VAR: &str = "WEATHER_CHAT_CONFIG";

fn load_config() -> weather_chat::Result<AppConfig> {
    match std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from) {
        Some(path) => AppConfig::from_env_or_file(path),
        None => AppConfig::from_env(),
    }
}

async fn run(cfg: AppConfig) -> weather_chat::Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|err| WeatherChatError::Config(format!("invalid server address: {err}")))?;

    let model = Arc::new(OpenAIClient::from_config(&cfg.model)?);
    let assistant = Arc::new(WeatherAssistant::from_config(model, &cfg)?);
    info!(model = %cfg.model.model, search = %cfg.search.endpoint, "weather assistant ready");

    server::serve(assistant, addr).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = match load_config().and_then(|cfg| cfg.validate().map(|()| cfg)) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("weather-chat: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = telemetry::init_tracing(&cfg.logging) {
        eprintln!("weather-chat: {err}");
        return ExitCode::FAILURE;
    }

    match run(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "weather chat stopped");
            ExitCode::FAILURE
        }
    }
}
