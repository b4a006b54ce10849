use std::path::PathBuf;

use thiserror::Error;

use crate::domain::message::{MessageId, MessageState};

/// Tool registry failures. Unknown/duplicate names are configuration errors at startup;
/// at runtime they only ever reject a single model request.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
    #[error("invalid arguments for tool `{tool}`: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("tool `{tool}` failed: {message}")]
    Invocation { tool: String, message: String },
}

impl ToolError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::DuplicateTool(_) => "duplicate_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Invocation { .. } => "tool_invocation",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ModelBackendError {
    #[error("model request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("model transport failure: {0}")]
    Transport(String),
    #[error("model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("message `{message_id}` is unreadable: {reason}")]
    Unreadable { message_id: MessageId, reason: String },
    #[error("could not read inbox entry `{path}`: {reason}")]
    Io { path: PathBuf, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionExecutionError {
    #[error("artifact `{path}` already exists")]
    AlreadyExists { path: PathBuf },
    #[error("could not write artifact `{path}`: {reason}")]
    Io { path: PathBuf, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuditPersistError {
    #[error("audit record for `{0}` already exists")]
    AlreadyRecorded(MessageId),
    #[error("could not serialize audit record: {0}")]
    Serialize(String),
    #[error("could not persist audit record at `{path}`: {reason}")]
    Io { path: PathBuf, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("could not move `{from}` to `{to}`: {reason}")]
    Move { from: PathBuf, to: PathBuf, reason: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid message transition from {from:?} to {to:?}")]
pub struct LifecycleTransitionError {
    pub from: MessageState,
    pub to: MessageState,
}

/// Failures escalated to the lifecycle coordinator. Each one is fatal for a single
/// message, which keeps its last successful state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    AuditPersist(#[from] AuditPersistError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Transition(#[from] LifecycleTransitionError),
}

impl LifecycleError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Acquisition(_) => "acquisition",
            Self::AuditPersist(_) => "audit_persist",
            Self::Archive(_) => "archive",
            Self::Transition(_) => "lifecycle_transition",
        }
    }

    pub fn operator_message(&self) -> &'static str {
        match self {
            Self::Acquisition(_) => {
                "The message could not be read. It was left in the inbox as NEW."
            }
            Self::AuditPersist(_) => {
                "The audit record could not be written. The message is stuck in ANALYZED and needs operator attention."
            }
            Self::Archive(_) => {
                "The message could not be moved to the processed folder. It remains ANALYZED."
            }
            Self::Transition(_) => "The message was not in a state that allows this step.",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::domain::message::{MessageId, MessageState};
    use crate::errors::{
        AcquisitionError, AuditPersistError, LifecycleError, LifecycleTransitionError, ToolError,
    };

    #[test]
    fn acquisition_failure_maps_to_acquisition_class() {
        let error = LifecycleError::from(AcquisitionError::Unreadable {
            message_id: MessageId("msg-1".to_owned()),
            reason: "binary content".to_owned(),
        });

        assert_eq!(error.error_class(), "acquisition");
        assert!(error.operator_message().contains("left in the inbox"));
        assert!(error.to_string().contains("msg-1"));
    }

    #[test]
    fn audit_failure_reports_stuck_in_analyzed() {
        let error = LifecycleError::from(AuditPersistError::Io {
            path: PathBuf::from("vault/logs/audit-msg-2.json"),
            reason: "disk full".to_owned(),
        });

        assert_eq!(error.error_class(), "audit_persist");
        assert!(error.operator_message().contains("ANALYZED"));
    }

    #[test]
    fn transition_error_names_both_states() {
        let error = LifecycleError::from(LifecycleTransitionError {
            from: MessageState::New,
            to: MessageState::Resolved,
        });

        assert_eq!(error.to_string(), "invalid message transition from New to Resolved");
    }

    #[test]
    fn tool_errors_have_stable_classes() {
        assert_eq!(ToolError::UnknownTool("x".to_owned()).error_class(), "unknown_tool");
        assert_eq!(ToolError::DuplicateTool("x".to_owned()).error_class(), "duplicate_tool");
    }
}
