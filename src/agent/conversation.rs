use crate::llm::ChatMessage;

/// Append-only transcript of one research run.
///
/// Each round consumes the previous conversation and returns the extended
/// one; nothing ever edits an earlier turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn start(system_prompt: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(query)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Extend with an assistant turn and the tool results answering it.
    #[must_use]
    pub fn with_tool_round(mut self, assistant: ChatMessage, results: Vec<ChatMessage>) -> Self {
        self.messages.push(assistant);
        self.messages.extend(results);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Role, ToolCall};

    #[test]
    fn rounds_append_in_order() {
        let start = Conversation::start("sys", "q");
        let snapshot = start.clone();

        let next = start.with_tool_round(
            ChatMessage::assistant_tool_calls(None, vec![ToolCall::new("c1", "webSearch", "{}")]),
            vec![ChatMessage::tool_result("c1", "[]")],
        );

        assert_eq!(snapshot.len(), 2);
        assert_eq!(next.len(), 4);
        assert_eq!(&next.messages()[..2], snapshot.messages());
        let roles: Vec<Role> = next.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);
    }
}
