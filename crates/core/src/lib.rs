pub mod approvals;
pub mod artifacts;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod execution;
pub mod inbox;
pub mod lifecycle;
pub mod skills;
pub mod vault;

pub use approvals::{ApprovalPrompt, ApprovalSurface, AutoApprove, ObserveOnly, ScriptedApproval};
pub use artifacts::{ArtifactRequest, ArtifactStore, FileArtifactStore, InMemoryArtifactStore};
pub use audit::{AuditEntry, AuditRecord, AuditStore, FileAuditStore, InMemoryAuditStore};
pub use config::{AppConfig, ApprovalMode, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::action::{derive_actions, ActionKind, ActionOutcome, ActionRequest, ProposedAction};
pub use domain::analysis::{AnalysisDefaults, AnalysisResult, Category, Priority};
pub use domain::message::{
    Envelope, Message, MessageBody, MessageId, MessageSource, MessageState,
};
pub use errors::{
    AcquisitionError, ActionExecutionError, ArchiveError, AuditPersistError, LifecycleError,
    LifecycleTransitionError, ModelBackendError, ToolError,
};
pub use execution::{ApprovalExecutionEngine, ExecutionPhase, ExecutionReport};
pub use inbox::{FolderArchive, FolderInbox, MessageArchive};
pub use lifecycle::{LifecycleEvent, MessageLifecycle, TransitionOutcome};
pub use vault::VaultLayout;
