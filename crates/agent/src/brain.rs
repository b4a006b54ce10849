//! Bounded reasoning loop: turns message text into exactly one [`AnalysisResult`].
//!
//! Each round sends the transcript and tool catalog to the model, runs whatever tools it
//! asks for and appends their results. The loop stops on a final answer or after
//! `max_rounds`, whichever comes first. Backend failures and tool failures never escape:
//! they cost a round or a field, and any field no tool produced falls back to its default.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use steward_core::config::AppConfig;
use steward_core::domain::analysis::{AnalysisDefaults, AnalysisResult, Category, Priority};
use steward_core::domain::message::MessageId;
use steward_core::errors::{ModelBackendError, ToolError};
use tracing::{info, warn};

use crate::conversation::Conversation;
use crate::llm::{LlmClient, ModelRequest, ModelTurn};
use crate::prompts::{analysis_prompt, SYSTEM_PROMPT};
use crate::tools::{
    ToolRegistry, CATEGORIZER, PRIORITY_DETECTOR, REPLY_SUGGESTER, SUMMARIZER, TASK_EXTRACTOR,
};

pub const DEFAULT_MAX_ROUNDS: u32 = 4;
pub const DEFAULT_ROUND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    FinalAnswer,
    RoundLimit,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FinalAnswer => "final_answer",
            Self::RoundLimit => "round_limit",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRecord {
    pub round: u32,
    pub tool_name: String,
    pub arguments: Value,
    pub result: Result<Value, ToolError>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoopOutcome {
    pub analysis: AnalysisResult,
    pub rounds: u32,
    pub stop: StopReason,
    pub tool_calls: Vec<ToolCallRecord>,
    pub backend_failures: u32,
}

/// Last-known value per analysis field, folded from successful tool results.
#[derive(Debug, Default)]
struct AnalysisAccumulator {
    summary: Option<String>,
    priority: Option<Priority>,
    category: Option<Category>,
    suggested_reply: Option<String>,
    tasks: Option<Vec<String>>,
}

impl AnalysisAccumulator {
    fn absorb(&mut self, tool_name: &str, value: &Value) {
        let text = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        };

        match tool_name {
            SUMMARIZER => {
                if let Some(summary) = text("summary") {
                    self.summary = Some(summary);
                }
            }
            PRIORITY_DETECTOR => {
                if let Some(priority) = text("priority").as_deref().and_then(Priority::parse) {
                    self.priority = Some(priority);
                }
            }
            CATEGORIZER => {
                if let Some(category) = text("category").as_deref().and_then(Category::parse) {
                    self.category = Some(category);
                }
            }
            REPLY_SUGGESTER => {
                let best = value
                    .get("suggestions")
                    .and_then(Value::as_array)
                    .and_then(|suggestions| suggestions.first())
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|reply| !reply.is_empty());
                if let Some(reply) = best {
                    self.suggested_reply = Some(reply.to_string());
                }
            }
            TASK_EXTRACTOR => {
                if let Some(tasks) = value.get("tasks").and_then(Value::as_array) {
                    self.tasks = Some(
                        tasks
                            .iter()
                            .filter_map(|task| task.get("title").and_then(Value::as_str))
                            .map(str::trim)
                            .filter(|title| !title.is_empty())
                            .map(str::to_string)
                            .collect(),
                    );
                }
            }
            _ => {}
        }
    }

    fn finish(
        self,
        message_id: &MessageId,
        body: &str,
        defaults: AnalysisDefaults,
        notes: String,
    ) -> AnalysisResult {
        let fallback = AnalysisResult::fallback(message_id.clone(), body, defaults, notes);
        AnalysisResult {
            summary: self.summary.unwrap_or(fallback.summary),
            priority: self.priority.unwrap_or(fallback.priority),
            category: self.category.unwrap_or(fallback.category),
            suggested_reply: self.suggested_reply,
            tasks: self.tasks.unwrap_or_default(),
            ..fallback
        }
    }
}

pub struct ReasoningLoop {
    client: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    max_rounds: u32,
    round_timeout: Duration,
    defaults: AnalysisDefaults,
}

impl ReasoningLoop {
    pub fn new(client: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            registry,
            max_rounds: DEFAULT_MAX_ROUNDS,
            round_timeout: DEFAULT_ROUND_TIMEOUT,
            defaults: AnalysisDefaults::default(),
        }
    }

    pub fn from_config(
        client: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self::new(client, registry)
            .with_max_rounds(config.agent.max_rounds)
            .with_round_timeout(Duration::from_secs(config.llm.timeout_secs))
            .with_defaults(config.agent.analysis_defaults())
    }

    /// At least one round always runs.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_round_timeout(mut self, round_timeout: Duration) -> Self {
        self.round_timeout = round_timeout;
        self
    }

    pub fn with_defaults(mut self, defaults: AnalysisDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub async fn analyze(&self, message_id: &MessageId, sender: &str, body: &str) -> LoopOutcome {
        let tools = self.registry.describe_all();
        let mut conversation = Conversation::new(SYSTEM_PROMPT, analysis_prompt(sender, body));
        let mut accumulator = AnalysisAccumulator::default();
        let mut tool_calls = Vec::new();
        let mut backend_failures = 0_u32;
        let mut final_text = None;
        let mut rounds = 0_u32;

        while rounds < self.max_rounds {
            rounds += 1;
            let request = ModelRequest { conversation: &conversation, tools: &tools };
            let pending = self.client.next_turn(request);
            let turn = match tokio::time::timeout(self.round_timeout, pending).await {
                Ok(Ok(turn)) => turn,
                Ok(Err(backend_error)) => {
                    backend_failures += 1;
                    log_model_error(message_id, rounds, &backend_error);
                    continue;
                }
                Err(_elapsed) => {
                    backend_failures += 1;
                    let backend_error =
                        ModelBackendError::Timeout { secs: self.round_timeout.as_secs() };
                    log_model_error(message_id, rounds, &backend_error);
                    continue;
                }
            };

            let calls = match turn {
                ModelTurn::Final(text) => {
                    final_text = Some(text);
                    break;
                }
                ModelTurn::ToolCalls(calls) => calls,
            };

            if !calls.is_empty() {
                conversation.push_tool_calls(&calls);
            }
            let mut failed = 0_usize;
            for call in &calls {
                let arguments = bind_message_body(call.arguments.clone(), body);
                let result = self.registry.invoke(&call.tool_name, arguments.clone()).await;
                let rendered = match &result {
                    Ok(value) => {
                        accumulator.absorb(&call.tool_name, value);
                        value.clone()
                    }
                    Err(tool_error) => {
                        failed += 1;
                        warn!(
                            event_name = "agent.tool_failed",
                            message_id = %message_id,
                            round = rounds,
                            tool = %call.tool_name,
                            error_class = tool_error.error_class(),
                            error = %tool_error,
                            "tool call rejected or failed"
                        );
                        json!({ "error": tool_error.to_string() })
                    }
                };
                conversation.push_tool_result(&call.id, &call.tool_name, &rendered);
                tool_calls.push(ToolCallRecord {
                    round: rounds,
                    tool_name: call.tool_name.clone(),
                    arguments,
                    result,
                });
            }

            info!(
                event_name = "agent.round_completed",
                message_id = %message_id,
                round = rounds,
                tool_calls = calls.len(),
                failed,
                "reasoning round completed"
            );
        }

        let stop = match final_text {
            Some(_) => StopReason::FinalAnswer,
            None => StopReason::RoundLimit,
        };
        let failed_calls = tool_calls.iter().filter(|record| record.result.is_err()).count();
        let notes = synthesis_notes(
            final_text.as_deref(),
            rounds,
            self.max_rounds,
            backend_failures,
            failed_calls,
        );
        let analysis = accumulator.finish(message_id, body, self.defaults, notes);

        info!(
            event_name = "agent.analysis_completed",
            message_id = %message_id,
            rounds,
            stop = stop.as_str(),
            priority = analysis.priority.as_str(),
            category = analysis.category.as_str(),
            tasks = analysis.tasks.len(),
            "analysis completed"
        );

        LoopOutcome { analysis, rounds, stop, tool_calls, backend_failures }
    }
}

/// Skills always read the message under analysis, whatever text the model passed along.
/// Non-object arguments are left untouched so the registry rejects them.
fn bind_message_body(mut arguments: Value, body: &str) -> Value {
    if let Some(object) = arguments.as_object_mut() {
        object.insert("content".to_string(), Value::String(body.to_string()));
    }
    arguments
}

fn log_model_error(message_id: &MessageId, round: u32, backend_error: &ModelBackendError) {
    warn!(
        event_name = "agent.model_error",
        message_id = %message_id,
        round,
        error = %backend_error,
        "model round produced no tool calls"
    );
}

fn synthesis_notes(
    final_text: Option<&str>,
    rounds: u32,
    max_rounds: u32,
    backend_failures: u32,
    failed_calls: usize,
) -> String {
    let mut notes = match final_text.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        Some(_) => format!("model finished after {rounds} round(s) without a synthesized answer"),
        None => format!("stopped at the round limit of {max_rounds}"),
    };
    if backend_failures > 0 {
        notes.push_str(&format!("; {backend_failures} model round(s) failed"));
    }
    if failed_calls > 0 {
        notes.push_str(&format!("; {failed_calls} tool call(s) failed"));
    }
    notes
}
