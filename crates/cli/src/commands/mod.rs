pub mod analyze;
pub mod config;
pub mod demo;
pub mod doctor;
pub mod process;
pub mod watch;

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use steward_agent::runtime::ProcessedMessage;
use steward_core::domain::action::{ActionKind, ActionOutcome};
use steward_core::domain::analysis::{Category, Priority};
use steward_core::domain::message::{Message, MessageId, MessageState};
use steward_core::errors::LifecycleError;

/// Exit code for a batch in which at least one message failed.
pub const EXIT_MESSAGE_FAILED: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None::<Value>)
    }

    pub fn success_with(
        command: &str,
        message: impl Into<String>,
        details: Option<impl Serialize>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details: details.and_then(|details| serde_json::to_value(details).ok()),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with(command, error_class, message, exit_code, None::<Value>)
    }

    pub fn failure_with(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        details: Option<impl Serialize>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: details.and_then(|details| serde_json::to_value(details).ok()),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[derive(Debug, Serialize)]
pub struct ActionReport {
    pub sequence: u32,
    pub kind: ActionKind,
    pub approved: bool,
    pub outcome: ActionOutcome,
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct MessageReport {
    pub message_id: MessageId,
    pub sender: String,
    pub summary: String,
    pub priority: Priority,
    pub category: Category,
    pub tasks: Vec<String>,
    pub actions: Vec<ActionReport>,
    pub audit_path: PathBuf,
    pub archived_to: Option<PathBuf>,
}

impl From<ProcessedMessage> for MessageReport {
    fn from(processed: ProcessedMessage) -> Self {
        let actions = processed
            .report
            .record
            .actions
            .iter()
            .map(|entry| ActionReport {
                sequence: entry.sequence,
                kind: entry.action.kind,
                approved: entry.approved,
                outcome: entry.outcome,
                artifact_path: entry.artifact_path.clone(),
            })
            .collect();

        Self {
            message_id: processed.message_id,
            sender: processed.sender,
            summary: processed.analysis.summary,
            priority: processed.analysis.priority,
            category: processed.analysis.category,
            tasks: processed.analysis.tasks,
            actions,
            audit_path: processed.report.audit_path,
            archived_to: processed.archived_to,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FailedMessage {
    pub message_id: MessageId,
    pub sender: String,
    pub state: MessageState,
    pub error_class: &'static str,
    pub operator_message: &'static str,
    pub error: String,
}

/// Per-command tally of resolved and failed messages, in processing order.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub processed: Vec<MessageReport>,
    pub failed: Vec<FailedMessage>,
}

impl BatchReport {
    pub fn record(&mut self, message: &Message, result: Result<ProcessedMessage, LifecycleError>) {
        match result {
            Ok(processed) => self.processed.push(MessageReport::from(processed)),
            Err(lifecycle_error) => self.failed.push(FailedMessage {
                message_id: message.id().clone(),
                sender: message.sender.clone(),
                state: message.state(),
                error_class: lifecycle_error.error_class(),
                operator_message: lifecycle_error.operator_message(),
                error: lifecycle_error.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.processed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        let message =
            format!("resolved {} message(s), {} failed", self.processed.len(), self.failed.len());
        if self.failed.is_empty() {
            CommandResult::success_with(command, message, Some(self))
        } else {
            CommandResult::failure_with(
                command,
                "message_failed",
                message,
                EXIT_MESSAGE_FAILED,
                Some(self),
            )
        }
    }
}
