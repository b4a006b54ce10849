use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use steward_core::errors::ModelBackendError;

use crate::conversation::{ChatRole, Conversation, ToolCallRequest};
use crate::tools::ToolSpec;

/// One round's input: the transcript so far and the tool catalog.
#[derive(Clone, Copy, Debug)]
pub struct ModelRequest<'a> {
    pub conversation: &'a Conversation,
    pub tools: &'a [ToolSpec],
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelTurn {
    ToolCalls(Vec<ToolCallRequest>),
    Final(String),
}

/// The external text-generation backend. One call per round, no retries.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn next_turn(&self, request: ModelRequest<'_>) -> Result<ModelTurn, ModelBackendError>;
}

/// Offline stand-in for a model: asks for every catalog tool once, then finishes.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkillSweep;

#[async_trait]
impl LlmClient for SkillSweep {
    async fn next_turn(&self, request: ModelRequest<'_>) -> Result<ModelTurn, ModelBackendError> {
        let swept =
            request.conversation.messages().iter().any(|message| message.role == ChatRole::Tool);
        if swept || request.tools.is_empty() {
            return Ok(ModelTurn::Final(format!(
                "analyzed offline with {} skill(s)",
                request.tools.len()
            )));
        }

        Ok(ModelTurn::ToolCalls(
            request
                .tools
                .iter()
                .map(|tool| {
                    ToolCallRequest::new(
                        format!("sweep-{}", tool.name),
                        tool.name.clone(),
                        serde_json::json!({ "content": "" }),
                    )
                })
                .collect(),
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ScriptedTurn {
    Reply(ModelTurn),
    Fail(ModelBackendError),
    /// Waits this long before answering with a final empty text.
    Stall(Duration),
}

impl ScriptedTurn {
    pub fn call(tool_name: &str, arguments: serde_json::Value) -> Self {
        Self::Reply(ModelTurn::ToolCalls(vec![ToolCallRequest::new(
            format!("call-{tool_name}"),
            tool_name,
            arguments,
        )]))
    }

    pub fn finish(text: &str) -> Self {
        Self::Reply(ModelTurn::Final(text.to_string()))
    }
}

/// Test double that plays back a script, then repeats `after_script` forever.
#[derive(Clone)]
pub struct ScriptedModel {
    script: Arc<Mutex<VecDeque<ScriptedTurn>>>,
    after_script: ScriptedTurn,
    calls: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedModel {
    pub fn new(script: impl IntoIterator<Item = ScriptedTurn>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            after_script: ScriptedTurn::finish(""),
            calls: Arc::default(),
        }
    }

    pub fn always(turn: ScriptedTurn) -> Self {
        Self::new([]).then_always(turn)
    }

    pub fn then_always(mut self, turn: ScriptedTurn) -> Self {
        self.after_script = turn;
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.transcript_lengths().len()
    }

    /// Transcript length seen by each call, in order.
    pub fn transcript_lengths(&self) -> Vec<usize> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn next_scripted(&self) -> ScriptedTurn {
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| self.after_script.clone())
    }
}

#[async_trait]
impl LlmClient for ScriptedModel {
    async fn next_turn(&self, request: ModelRequest<'_>) -> Result<ModelTurn, ModelBackendError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(request.conversation.len()),
            Err(poisoned) => poisoned.into_inner().push(request.conversation.len()),
        }

        match self.next_scripted() {
            ScriptedTurn::Reply(turn) => Ok(turn),
            ScriptedTurn::Fail(error) => Err(error),
            ScriptedTurn::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ModelTurn::Final(String::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LlmClient, ModelRequest, ModelTurn, ScriptedModel, ScriptedTurn, SkillSweep};
    use crate::conversation::Conversation;
    use crate::tools::ToolRegistry;

    #[tokio::test]
    async fn sweep_calls_every_tool_then_finishes() {
        let tools = ToolRegistry::with_builtin_skills().expect("registry").describe_all();
        let mut conversation = Conversation::new("system", "user");

        let first =
            SkillSweep.next_turn(ModelRequest { conversation: &conversation, tools: &tools }).await;
        let Ok(ModelTurn::ToolCalls(calls)) = first else {
            panic!("expected tool calls, got {first:?}");
        };
        assert_eq!(calls.len(), tools.len());

        conversation.push_tool_calls(&calls);
        conversation.push_tool_result(&calls[0].id, &calls[0].tool_name, &serde_json::json!({}));
        let second =
            SkillSweep.next_turn(ModelRequest { conversation: &conversation, tools: &tools }).await;
        assert!(matches!(second, Ok(ModelTurn::Final(_))));
    }

    #[tokio::test]
    async fn scripted_model_falls_back_after_the_script() {
        let model = ScriptedModel::new([ScriptedTurn::finish("one")])
            .then_always(ScriptedTurn::finish("again"));
        let conversation = Conversation::new("system", "user");
        let request = ModelRequest { conversation: &conversation, tools: &[] };

        assert_eq!(model.next_turn(request).await, Ok(ModelTurn::Final("one".to_string())));
        assert_eq!(model.next_turn(request).await, Ok(ModelTurn::Final("again".to_string())));
        assert_eq!(model.call_count(), 2);
    }
}
