use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::{Result, WeatherChatError};
use crate::llm::{LanguageModel, ModelCompletion};
use crate::memory::{ConversationMemory, FullMemoryStrategy, MemoryStrategy};
use crate::message::Message;
use crate::tool::ToolRegistry;

/// Marker the model is told to put in front of its final reply.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

/// An agent that alternates between the LLM and registered tools.
pub struct Agent<M: LanguageModel> {
    system_prompt: String,
    model: Arc<M>,
    tools: ToolRegistry,
    memory: ConversationMemory,
    memory_strategy: Arc<dyn MemoryStrategy>,
    max_steps: usize,
}

impl<M: LanguageModel> Agent<M> {
    pub fn new(model: Arc<M>) -> Self {
        Self {
            system_prompt: "You are a helpful agent.".to_string(),
            model,
            tools: ToolRegistry::new(),
            memory: ConversationMemory::default(),
            memory_strategy: Arc::new(FullMemoryStrategy),
            max_steps: 15,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_memory(mut self, memory: ConversationMemory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_memory_strategy(mut self, strategy: Arc<dyn MemoryStrategy>) -> Self {
        self.memory_strategy = strategy;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn into_memory(self) -> ConversationMemory {
        self.memory
    }

    /// Run a single exchange with the agent. Returns the final assistant reply.
    #[instrument(skip_all, fields(max_steps = self.max_steps, memory = self.memory_strategy.name()))]
    pub async fn respond(&mut self, user_input: impl Into<String>) -> Result<String> {
        let user_input = user_input.into();
        if user_input.trim().is_empty() {
            return Err(WeatherChatError::Protocol("empty user input".into()));
        }
        self.memory.push(Message::user(user_input));

        for step in 0..self.max_steps {
            let mut request = vec![Message::system(self.build_system_message())];
            request.extend(
                self.memory_strategy
                    .get_context_messages(self.memory.messages()),
            );
            let completion = self
                .model
                .complete_chat(&request, &self.tools.describe())
                .await?;

            if !completion.tool_calls.is_empty() {
                debug!(step, calls = completion.tool_calls.len(), "model requested tools");
                for mut call in completion.tool_calls {
                    if call.id.is_none() {
                        call.id = Some(format!("call-{}", self.memory.len()));
                    }
                    let call_id = call.id.clone();
                    let name = call.name.clone();
                    let arguments = call.arguments.clone();
                    self.memory.push(Message::tool_call(call));

                    // Failed calls go back to the model as text so it can correct itself.
                    let output = match self.tools.call(&name, arguments).await {
                        Ok(value) => value,
                        Err(err) => {
                            warn!(tool = %name, error = %err, "tool call failed");
                            serde_json::Value::String(format!("Error: {err}"))
                        }
                    };
                    self.memory
                        .push(Message::tool_with_call(&name, output, call_id));
                }
                continue;
            }

            match completion {
                ModelCompletion {
                    content: Some(content),
                    ..
                } if !content.trim().is_empty() => {
                    let answer = extract_final_answer(&content);
                    self.memory.push(Message::assistant(&answer));
                    info!(step, "agent produced a final answer");
                    return Ok(answer);
                }
                _ => {
                    return Err(WeatherChatError::Protocol(
                        "Model response missing content and tool calls".into(),
                    ))
                }
            }
        }

        Err(WeatherChatError::Protocol(
            "Agent reached the step limit without returning a response".into(),
        ))
    }

    fn build_system_message(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&self.system_prompt);
        if self.tools.is_empty() {
            prompt.push_str("\n\nNo tools are available.");
        } else {
            prompt.push_str("\n\nAvailable tools:\n");
            for tool in self.tools.describe() {
                prompt.push_str(&format!("- {}: {}\n", tool.name, tool.description));
            }
        }
        prompt
    }
}

/// Text after the last `Final Answer:` marker, or the whole reply when there is none.
pub fn extract_final_answer(content: &str) -> String {
    match content.rfind(FINAL_ANSWER_MARKER) {
        Some(idx) => {
            let answer = content[idx + FINAL_ANSWER_MARKER.len()..].trim();
            if answer.is_empty() {
                content.trim().to_string()
            } else {
                answer.to_string()
            }
        }
        None => content.trim().to_string(),
    }
}
