//! Running transcript sent to the model each round.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model. `arguments` is whatever the model sent,
/// decoded from JSON when possible; it is validated before anything runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self { id: id.into(), tool_name: tool_name.into(), arguments }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self { role, content: Some(content.into()), tool_calls: Vec::new(), tool_call_id: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![
                ChatMessage::text(ChatRole::System, system_prompt),
                ChatMessage::text(ChatRole::User, user_prompt),
            ],
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

    pub fn push_tool_calls(&mut self, calls: &[ToolCallRequest]) {
        self.messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content: None,
            tool_calls: calls.to_vec(),
            tool_call_id: None,
        });
    }

    pub fn push_tool_result(&mut self, call_id: &str, tool_name: &str, result: &Value) {
        let content = serde_json::json!({ "tool": tool_name, "result": result }).to_string();
        self.messages.push(ChatMessage {
            role: ChatRole::Tool,
            content: Some(content),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.to_string()),
        });
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::text(ChatRole::Assistant, text));
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ChatRole, Conversation, ToolCallRequest};

    #[test]
    fn tool_round_appends_call_then_result() {
        let mut conversation = Conversation::new("system", "user");
        let call = ToolCallRequest::new("call-1", "summarizer", json!({"content": "hi"}));

        conversation.push_tool_calls(std::slice::from_ref(&call));
        conversation.push_tool_result("call-1", "summarizer", &json!({"summary": "hi"}));

        let roles = conversation.messages().iter().map(|m| m.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![ChatRole::System, ChatRole::User, ChatRole::Assistant, ChatRole::Tool]
        );
        let tool_message = &conversation.messages()[3];
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call-1"));
        assert!(tool_message.content.as_deref().unwrap_or_default().contains("\"summary\""));
    }
}
