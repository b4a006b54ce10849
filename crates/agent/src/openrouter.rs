//! OpenAI-compatible chat completions backend (OpenRouter, OpenAI, Ollama).
//!
//! One HTTP request per round. Nothing here retries: a timeout, transport error, non-2xx
//! status or unparseable body becomes a [`ModelBackendError`] and the loop moves on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use steward_core::config::{LlmConfig, LlmProvider};
use steward_core::errors::ModelBackendError;
use tracing::debug;

use crate::conversation::{ChatMessage, ToolCallRequest};
use crate::llm::{LlmClient, ModelRequest, ModelTurn};
use crate::tools::ToolSpec;

const ERROR_BODY_LIMIT: usize = 512;
const APP_TITLE: &str = "steward";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireToolDefinition<'a>,
}

#[derive(Debug, Serialize)]
struct WireToolDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: WireToolCallFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

pub struct OpenAiCompatibleClient {
    client: Client,
    endpoint: String,
    provider: LlmProvider,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    /// Pre-computed `"Bearer <key>"` header value.
    auth_header: Option<String>,
}

impl OpenAiCompatibleClient {
    /// Fails only when the TLS backend or resolver cannot be initialised.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ModelBackendError> {
        let auth_header = config
            .api_key
            .as_ref()
            .map(|key| key.expose_secret().trim().to_string())
            .filter(|key| !key.is_empty())
            .map(|key| format!("Bearer {key}"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|error| {
                ModelBackendError::Transport(format!("could not build http client: {error}"))
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.endpoint_base()),
            provider: config.provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            auth_header,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_request<'a>(&'a self, request: ModelRequest<'a>) -> ChatRequest<'a> {
        let tools = request.tools.iter().map(wire_tool).collect::<Vec<_>>();
        ChatRequest {
            model: &self.model,
            messages: request.conversation.messages().iter().map(wire_message).collect(),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    fn map_transport(&self, error: reqwest::Error) -> ModelBackendError {
        if error.is_timeout() {
            ModelBackendError::Timeout { secs: self.timeout_secs }
        } else {
            ModelBackendError::Transport(error.to_string())
        }
    }
}

fn wire_tool(spec: &ToolSpec) -> WireTool<'_> {
    WireTool {
        r#type: "function",
        function: WireToolDefinition {
            name: &spec.name,
            description: &spec.description,
            parameters: &spec.parameters,
        },
    }
}

fn wire_message(message: &ChatMessage) -> WireMessage {
    let tool_calls = (!message.tool_calls.is_empty()).then(|| {
        message
            .tool_calls
            .iter()
            .map(|call| WireToolCall {
                id: call.id.clone(),
                r#type: function_type(),
                function: WireToolCallFunction {
                    name: call.tool_name.clone(),
                    arguments: call.arguments.to_string(),
                },
            })
            .collect()
    });

    WireMessage {
        role: message.role.as_str(),
        content: message.content.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls,
    }
}

/// Maps a response body to the next turn. Arguments that are not valid JSON are kept as a
/// raw string so the registry rejects that single call.
fn parse_turn(body: &str) -> Result<ModelTurn, ModelBackendError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|error| ModelBackendError::MalformedResponse(error.to_string()))?;
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        ModelBackendError::MalformedResponse("response contained no choices".to_string())
    })?;

    match choice.message.tool_calls {
        Some(calls) if !calls.is_empty() => Ok(ModelTurn::ToolCalls(
            calls
                .into_iter()
                .enumerate()
                .map(|(index, call)| {
                    let arguments = serde_json::from_str(&call.function.arguments)
                        .unwrap_or(Value::String(call.function.arguments));
                    let id = if call.id.is_empty() { format!("call-{index}") } else { call.id };
                    ToolCallRequest::new(id, call.function.name, arguments)
                })
                .collect(),
        )),
        _ => Ok(ModelTurn::Final(choice.message.content.unwrap_or_default())),
    }
}

fn truncate(body: &str) -> String {
    if body.chars().count() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut truncated = body.chars().take(ERROR_BODY_LIMIT).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn next_turn(&self, request: ModelRequest<'_>) -> Result<ModelTurn, ModelBackendError> {
        let payload = self.build_request(request);
        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(auth_header) = &self.auth_header {
            builder = builder.header("Authorization", auth_header);
        }
        if self.provider == LlmProvider::OpenRouter {
            builder = builder.header("X-Title", APP_TITLE);
        }

        debug!(
            event_name = "agent.model_request",
            endpoint = %self.endpoint,
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "sending chat completion request"
        );

        let response = builder.send().await.map_err(|error| self.map_transport(error))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| self.map_transport(error))?;

        if !status.is_success() {
            let status = status.as_u16();
            return Err(ModelBackendError::Status { status, body: truncate(&body) });
        }
        parse_turn(&body)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use serde_json::json;
    use steward_core::config::{LlmConfig, LlmProvider};
    use steward_core::errors::ModelBackendError;

    use super::{parse_turn, OpenAiCompatibleClient};
    use crate::conversation::{Conversation, ToolCallRequest};
    use crate::llm::{ModelRequest, ModelTurn};
    use crate::tools::ToolRegistry;

    fn config(provider: LlmProvider, base_url: Option<&str>) -> LlmConfig {
        LlmConfig {
            provider,
            api_key: Some(SecretString::from("sk-test".to_string())),
            base_url: base_url.map(str::to_string),
            model: "test-model".to_string(),
            temperature: 0.2,
            max_tokens: 256,
            timeout_secs: 5,
        }
    }

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        let ollama = config(LlmProvider::Ollama, Some("http://h/v1/"));
        let client = OpenAiCompatibleClient::from_config(&ollama).expect("client");
        assert_eq!(client.endpoint(), "http://h/v1/chat/completions");

        let openrouter = config(LlmProvider::OpenRouter, None);
        let client = OpenAiCompatibleClient::from_config(&openrouter).expect("client");
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn request_carries_tools_and_tool_round_trip_messages() {
        let openai = config(LlmProvider::OpenAi, None);
        let client = OpenAiCompatibleClient::from_config(&openai).expect("client");
        let registry = ToolRegistry::with_builtin_skills().expect("registry");
        let tools = registry.describe_all();
        let mut conversation = Conversation::new("system", "user");
        let call = ToolCallRequest::new("call-1", "summarizer", json!({"content": "hi"}));
        conversation.push_tool_calls(std::slice::from_ref(&call));
        conversation.push_tool_result("call-1", "summarizer", &json!({"summary": "hi"}));

        let request = ModelRequest { conversation: &conversation, tools: &tools };
        let payload = client.build_request(request);
        let value = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(value["tool_choice"], json!("auto"));
        assert_eq!(value["tools"].as_array().map(Vec::len), Some(5));
        assert_eq!(value["tools"][0]["type"], json!("function"));
        assert_eq!(value["messages"][2]["role"], json!("assistant"));
        assert_eq!(
            value["messages"][2]["tool_calls"][0]["function"]["arguments"],
            json!(r#"{"content":"hi"}"#)
        );
        assert_eq!(value["messages"][3]["tool_call_id"], json!("call-1"));
        assert!(value["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn tool_calls_take_precedence_over_content() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": "thinking",
                    "tool_calls": [{
                        "id": "abc",
                        "type": "function",
                        "function": {"name": "task_extractor", "arguments": "{\"content\":\"x\"}"}
                    }]
                }
            }]
        })
        .to_string();

        let turn = parse_turn(&body).expect("parse");
        assert_eq!(
            turn,
            ModelTurn::ToolCalls(vec![ToolCallRequest::new(
                "abc",
                "task_extractor",
                json!({"content": "x"})
            )])
        );
    }

    #[test]
    fn unparseable_arguments_are_kept_raw() {
        let body = json!({
            "choices": [{"message": {"tool_calls": [{
                "id": "",
                "function": {"name": "summarizer", "arguments": "{not json"}
            }]}}]
        })
        .to_string();

        let Ok(ModelTurn::ToolCalls(calls)) = parse_turn(&body) else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].id, "call-0");
        assert_eq!(calls[0].arguments, json!("{not json"));
    }

    #[test]
    fn plain_content_is_a_final_answer() {
        let body = json!({"choices": [{"message": {"content": "Summary: ok"}}]}).to_string();
        assert_eq!(parse_turn(&body), Ok(ModelTurn::Final("Summary: ok".to_string())));
    }

    #[test]
    fn empty_or_invalid_bodies_are_malformed() {
        assert!(matches!(
            parse_turn(r#"{"choices": []}"#),
            Err(ModelBackendError::MalformedResponse(_))
        ));
        assert!(matches!(parse_turn("<html>"), Err(ModelBackendError::MalformedResponse(_))));
    }
}
