use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};
use uuid::Uuid;

use crate::assistant::WeatherAssistant;
use crate::error::{Result, WeatherChatError};
use crate::llm::LanguageModel;

pub struct AppState<M: LanguageModel + 'static> {
    pub assistant: Arc<WeatherAssistant<M>>,
}

impl<M: LanguageModel + 'static> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            assistant: Arc::clone(&self.assistant),
        }
    }
}

pub fn router<M: LanguageModel + 'static>(assistant: Arc<WeatherAssistant<M>>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "ok" }))
        .route("/api/ask", post(ask::<M>))
        .with_state(AppState { assistant })
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve<M: LanguageModel + 'static>(
    assistant: Arc<WeatherAssistant<M>>,
    addr: SocketAddr,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "weather chat listening");
    serve_on(listener, assistant).await
}

pub async fn serve_on<M: LanguageModel + 'static>(
    listener: TcpListener,
    assistant: Arc<WeatherAssistant<M>>,
) -> Result<()> {
    axum::serve(listener, router(assistant).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| WeatherChatError::Protocol(format!("server error: {err}")))?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    answer: String,
    session_id: String,
}

async fn ask<M: LanguageModel + 'static>(
    State(state): State<AppState<M>>,
    Json(req): Json<AskRequest>,
) -> Response {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "query must not be empty"})),
        )
            .into_response();
    }

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match state.assistant.ask(&session_id, &req.query).await {
        Ok(answer) => Json(AskResponse { answer, session_id }).into_response(),
        Err(err) => {
            error!(error = %err, "weather question failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": err.to_string(), "session_id": session_id})),
            )
                .into_response()
        }
    }
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
<!doctype html>
<html>
<head>
    <meta charset="utf-8" />
    <title>Live Weather Chatbot</title>
    <style>
        body { font-family: sans-serif; margin: 2rem auto; max-width: 44rem; }
        label { display: block; margin-bottom: .5rem; }
        input { width: 100%; padding: .5rem; box-sizing: border-box; }
        button { margin-top: .75rem; padding: .5rem 1rem; }
        #spinner { display: none; margin-top: 1rem; color: #555; }
        #answer { white-space: pre-wrap; margin-top: 1rem; }
        .error { color: #b00020; }
    </style>
</head>
<body>
    <h1>Live Weather Chatbot</h1>
    <p>Ask about the weather anywhere. For example:</p>
    <ul>
        <li>What does the weather look like in Pittsburgh today?</li>
        <li>How will the weather look in Pittsburgh over the next four days?</li>
    </ul>
    <label for="query">Enter your weather query:</label>
    <input id="query" type="text" autocomplete="off" />
    <button id="ask" disabled>Get Weather</button>
    <div id="spinner">Fetching live weather information...</div>
    <div id="answer"></div>
    <script>
        const input = document.getElementById('query');
        const button = document.getElementById('ask');
        const spinner = document.getElementById('spinner');
        const answer = document.getElementById('answer');
        let sessionId = sessionStorage.getItem('weather-chat-session');

        input.addEventListener('input', () => { button.disabled = input.value.trim() === ''; });
        input.addEventListener('keydown', (ev) => { if (ev.key === 'Enter') button.click(); });

        button.addEventListener('click', async () => {
            const query = input.value;
            if (query.trim() === '') return;
            button.disabled = true;
            spinner.style.display = 'block';
            answer.className = '';
            answer.textContent = '';
            try {
                const res = await fetch('/api/ask', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ query, session_id: sessionId }),
                });
                const body = await res.json();
                if (body.session_id) {
                    sessionId = body.session_id;
                    sessionStorage.setItem('weather-chat-session', sessionId);
                }
                if (res.ok) {
                    answer.textContent = body.answer;
                } else {
                    answer.className = 'error';
                    answer.textContent = body.error;
                }
            } catch (err) {
                answer.className = 'error';
                answer.textContent = String(err);
            } finally {
                spinner.style.display = 'none';
                button.disabled = input.value.trim() === '';
            }
        });
    </script>
</body>
</html>
"#,
    )
}
