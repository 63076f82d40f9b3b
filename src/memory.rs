use crate::message::{Message, Role};

/// In-memory transcript storage.
#[derive(Default, Clone, Debug)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Decides which part of the transcript is sent to the model.
pub trait MemoryStrategy: Send + Sync {
    /// Apply the strategy to get messages to send to the LLM
    fn get_context_messages(&self, messages: &[Message]) -> Vec<Message>;

    /// Name of the strategy
    fn name(&self) -> &str;
}

/// Keep all messages (default, no limiting)
#[derive(Clone, Default)]
pub struct FullMemoryStrategy;

impl MemoryStrategy for FullMemoryStrategy {
    fn get_context_messages(&self, messages: &[Message]) -> Vec<Message> {
        messages.to_vec()
    }

    fn name(&self) -> &str {
        "full"
    }
}

/// Keep only the last N messages (sliding window)
#[derive(Clone)]
pub struct WindowedMemoryStrategy {
    window_size: usize,
}

impl WindowedMemoryStrategy {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }
}

impl MemoryStrategy for WindowedMemoryStrategy {
    fn get_context_messages(&self, messages: &[Message]) -> Vec<Message> {
        if messages.len() <= self.window_size {
            return messages.to_vec();
        }

        let mut result: Vec<Message> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .cloned()
            .collect();

        let non_system: Vec<&Message> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .collect();

        let mut start = non_system.len().saturating_sub(self.window_size);
        // A tool result is meaningless without the assistant turn that requested it.
        while start < non_system.len() && non_system[start].role == Role::Tool {
            start += 1;
        }

        result.extend(non_system[start..].iter().map(|msg| (*msg).clone()));
        result
    }

    fn name(&self) -> &str {
        "windowed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use serde_json::json;

    #[test]
    fn test_windowed_strategy() {
        let messages = vec![
            Message::system("You are a helpful assistant"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::user("How are you?"),
            Message::assistant("I'm doing well!"),
            Message::user("What's 2+2?"),
            Message::assistant("4"),
        ];

        let strategy = WindowedMemoryStrategy::new(4);
        let context = strategy.get_context_messages(&messages);

        // Should keep system + last 4 non-system messages
        assert_eq!(context.len(), 5);
        assert_eq!(context[0].content, "You are a helpful assistant");
        assert_eq!(context[1].content, "How are you?");
    }

    #[test]
    fn window_skips_orphaned_tool_results() {
        let messages = vec![
            Message::user("weather in Pittsburgh?"),
            Message::tool_call(ToolCall {
                id: Some("c1".into()),
                name: "SERPWeatherAPI".into(),
                arguments: json!({"query": "weather in Pittsburgh"}),
            }),
            Message::tool_with_call("SERPWeatherAPI", json!("72°F"), Some("c1".into())),
            Message::assistant("It is 72°F."),
            Message::user("and tomorrow?"),
        ];

        let context = WindowedMemoryStrategy::new(3).get_context_messages(&messages);

        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, "It is 72°F.");
    }

    #[test]
    fn full_strategy_keeps_everything() {
        let messages = vec![Message::user("a"), Message::assistant("b")];

        assert_eq!(FullMemoryStrategy.get_context_messages(&messages), messages);
        assert_eq!(FullMemoryStrategy.name(), "full");
    }
}
