//! Skills exposed to the model under stable names, and the registry that dispatches to them.
//!
//! The registry is built once at startup and only read afterwards. Everything the model sends
//! is untrusted: unknown names and arguments that do not match a tool's schema are rejected
//! before any skill runs.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use steward_core::errors::ToolError;
use steward_core::skills::{categorize, detect_priority, extract_tasks, suggest_reply, summarize};

pub const SUMMARIZER: &str = "summarizer";
pub const PRIORITY_DETECTOR: &str = "priority_detector";
pub const CATEGORIZER: &str = "categorizer";
pub const REPLY_SUGGESTER: &str = "reply_suggester";
pub const TASK_EXTRACTOR: &str = "task_extractor";

/// Catalog entry handed to the model. `parameters` is a JSON-schema object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<Value>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Ordered name → tool table. Registration order is the order the catalog is presented in.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// The five built-in skills, in catalog order.
    pub fn with_builtin_skills() -> Result<Self, ToolError> {
        let mut registry = Self::default();
        registry.register(SummarizerTool)?;
        registry.register(PriorityDetectorTool)?;
        registry.register(CategorizerTool)?;
        registry.register(ReplySuggesterTool)?;
        registry.register(TaskExtractorTool)?;
        Ok(registry)
    }

    pub fn register<T>(&mut self, tool: T) -> Result<(), ToolError>
    where
        T: Tool + 'static,
    {
        if self.get(tool.name()).is_some() {
            return Err(ToolError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(Box::new(tool));
        Ok(())
    }

    pub fn describe_all(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().find(|tool| tool.name() == name).map(|tool| tool.as_ref())
    }

    pub async fn invoke(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        validate_arguments(name, &tool.parameters(), &arguments)?;
        tool.execute(arguments).await.map_err(|error| ToolError::Invocation {
            tool: name.to_string(),
            message: format!("{error:#}"),
        })
    }
}

/// Checks `arguments` against the subset of JSON schema the built-in tools use: an object
/// with declared string properties, some of them required, and nothing else.
pub fn validate_arguments(tool: &str, schema: &Value, arguments: &Value) -> Result<(), ToolError> {
    let invalid = |reason: String| ToolError::InvalidArguments { tool: tool.to_string(), reason };

    let Some(arguments) = arguments.as_object() else {
        return Err(invalid("arguments must be a JSON object".to_string()));
    };
    let empty = Map::new();
    let properties = schema.get("properties").and_then(Value::as_object).unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if !arguments.contains_key(key) {
                return Err(invalid(format!("missing required argument `{key}`")));
            }
        }
    }

    for (key, value) in arguments {
        let Some(property) = properties.get(key) else {
            return Err(invalid(format!("unexpected argument `{key}`")));
        };
        let matches = match property.get("type").and_then(Value::as_str) {
            Some("string") => value.is_string(),
            Some("number") => value.is_number(),
            Some("boolean") => value.is_boolean(),
            Some("object") => value.is_object(),
            Some("array") => value.is_array(),
            _ => true,
        };
        if !matches {
            return Err(invalid(format!("argument `{key}` has the wrong type")));
        }
    }
    Ok(())
}

fn content_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "content": { "type": "string", "description": description }
        },
        "required": ["content"],
        "additionalProperties": false
    })
}

fn content_arg(input: &Value) -> Result<&str> {
    input
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("`content` must be a string"))
}

pub struct SummarizerTool;

#[async_trait]
impl Tool for SummarizerTool {
    fn name(&self) -> &'static str {
        SUMMARIZER
    }

    fn description(&self) -> &'static str {
        "Summarize the message and list its key points and keywords."
    }

    fn parameters(&self) -> Value {
        content_schema("Message text to summarize")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(summarize(content_arg(&input)?))?)
    }
}

pub struct PriorityDetectorTool;

#[async_trait]
impl Tool for PriorityDetectorTool {
    fn name(&self) -> &'static str {
        PRIORITY_DETECTOR
    }

    fn description(&self) -> &'static str {
        "Classify how urgent the message is: HIGH, MEDIUM or LOW."
    }

    fn parameters(&self) -> Value {
        content_schema("Message text to assess")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(detect_priority(content_arg(&input)?))?)
    }
}

pub struct CategorizerTool;

#[async_trait]
impl Tool for CategorizerTool {
    fn name(&self) -> &'static str {
        CATEGORIZER
    }

    fn description(&self) -> &'static str {
        "Categorize the message as WORK, PERSONAL, STUDY, FINANCE or OTHER."
    }

    fn parameters(&self) -> Value {
        content_schema("Message text to categorize")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(categorize(content_arg(&input)?))?)
    }
}

pub struct ReplySuggesterTool;

#[async_trait]
impl Tool for ReplySuggesterTool {
    fn name(&self) -> &'static str {
        REPLY_SUGGESTER
    }

    fn description(&self) -> &'static str {
        "Suggest up to three short professional replies to the message."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "Message text to reply to" },
                "sender": { "type": "string", "description": "Who sent the message" }
            },
            "required": ["content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let sender = input.get("sender").and_then(Value::as_str);
        Ok(serde_json::to_value(suggest_reply(content_arg(&input)?, sender))?)
    }
}

pub struct TaskExtractorTool;

#[async_trait]
impl Tool for TaskExtractorTool {
    fn name(&self) -> &'static str {
        TASK_EXTRACTOR
    }

    fn description(&self) -> &'static str {
        "Extract action items and deadlines from the message."
    }

    fn parameters(&self) -> Value {
        content_schema("Message text to scan for tasks")
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        Ok(serde_json::to_value(extract_tasks(content_arg(&input)?))?)
    }
}
