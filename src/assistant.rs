//! The weather assistant: an [`Agent`] holding only the SERP weather tool,
//! with one conversation memory per browser session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::agent::Agent;
use crate::config::{AgentConfig, AppConfig};
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::memory::{ConversationMemory, FullMemoryStrategy, MemoryStrategy, WindowedMemoryStrategy};
use crate::message::Message;
use crate::tool::ToolRegistry;
use crate::tools::SerpWeatherTool;
use crate::weather::WeatherLookup;

pub const WEATHER_SYSTEM_PROMPT: &str = "You are a helpful weather assistant. When a user asks about the weather, \
use the SERPWeatherAPI tool to obtain live weather forecast data. \
If the query asks for forecasts over multiple days, make sure to include detailed temperature information \
for each day in your final answer. Return your final answer as:\n\n\
Final Answer: <your concise and detailed forecast>\n\n\
Do not add extra commentary.";

/// Registry holding the weather tool and nothing else.
pub fn weather_tools(lookup: WeatherLookup) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SerpWeatherTool::new(lookup));
    registry
}

struct Session {
    memory: Arc<Mutex<ConversationMemory>>,
    last_used: Instant,
}

pub struct WeatherAssistant<M: LanguageModel> {
    model: Arc<M>,
    tools: ToolRegistry,
    settings: AgentConfig,
    sessions: RwLock<HashMap<String, Session>>,
}

impl<M: LanguageModel> WeatherAssistant<M> {
    pub fn new(model: Arc<M>, tools: ToolRegistry, settings: AgentConfig) -> Self {
        Self {
            model,
            tools,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(model: Arc<M>, cfg: &AppConfig) -> Result<Self> {
        let lookup = WeatherLookup::new(&cfg.search)?;
        Ok(Self::new(model, weather_tools(lookup), cfg.agent.clone()))
    }

    /// Answer `query` in the context of `session_id`'s earlier turns.
    ///
    /// Turns of one session run one at a time. A session is only kept once
    /// one of its turns succeeds, and a failed turn leaves its memory as it was.
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn ask(&self, session_id: &str, query: &str) -> Result<String> {
        let slot = self.session(session_id).await;
        let mut memory = slot.lock().await;
        let previous = memory.clone();

        let mut agent = Agent::new(Arc::clone(&self.model))
            .with_system_prompt(WEATHER_SYSTEM_PROMPT)
            .with_tools(self.tools.clone())
            .with_memory(std::mem::take(&mut *memory))
            .with_memory_strategy(self.memory_strategy())
            .with_max_steps(self.settings.max_steps);

        let result = agent.respond(query).await;
        match &result {
            Ok(_) => {
                *memory = agent.into_memory();
                self.remember(session_id, &slot).await;
            }
            Err(_) => *memory = previous,
        }
        let turns = memory.len();
        drop(memory);

        let sessions = self.session_count().await;
        info!(
            success = result.is_ok(),
            turns,
            sessions,
            "weather question handled"
        );
        result
    }

    /// Messages recorded so far for `session_id`.
    pub async fn transcript(&self, session_id: &str) -> Vec<Message> {
        let memory = self.live_session(session_id).await;
        match memory {
            Some(memory) => memory.lock().await.messages().to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of conversations currently held.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn live_session(&self, session_id: &str) -> Option<Arc<Mutex<ConversationMemory>>> {
        let idle_limit = self.idle_limit();
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|session| session.last_used.elapsed() < idle_limit)
            .map(|session| Arc::clone(&session.memory))
    }

    /// Known memory for `session_id`, or a fresh one that is not stored yet.
    async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationMemory>> {
        self.live_session(session_id).await.unwrap_or_default()
    }

    /// Store `memory` under `session_id`, dropping idle sessions and, at
    /// capacity, the least recently used one.
    async fn remember(&self, session_id: &str, memory: &Arc<Mutex<ConversationMemory>>) {
        let now = Instant::now();
        let idle_limit = self.idle_limit();
        let capacity = self.settings.max_sessions.max(1);

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| now.duration_since(session.last_used) < idle_limit);

        if !sessions.contains_key(session_id) && sessions.len() >= capacity {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                debug!(session = %oldest, "evicting least recently used session");
                sessions.remove(&oldest);
            }
        }

        sessions.insert(
            session_id.to_string(),
            Session {
                memory: Arc::clone(memory),
                last_used: now,
            },
        );
    }

    fn idle_limit(&self) -> Duration {
        Duration::from_secs(self.settings.session_idle_secs)
    }

    fn memory_strategy(&self) -> Arc<dyn MemoryStrategy> {
        match self.settings.memory_window {
            Some(window) => Arc::new(WindowedMemoryStrategy::new(window)),
            None => Arc::new(FullMemoryStrategy),
        }
    }
}
