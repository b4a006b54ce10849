//! Message lifecycle coordinator: drives one message NEW → ANALYZED → RESOLVED.
//!
//! The coordinator is the only place that advances message state. A fatal error at either
//! transition leaves the message in its last successful state and is returned to the caller,
//! which reports it. Nothing is retried here.

use std::path::PathBuf;
use std::sync::Arc;

use steward_core::approvals::ApprovalSurface;
use steward_core::artifacts::FileArtifactStore;
use steward_core::audit::FileAuditStore;
use steward_core::config::AppConfig;
use steward_core::domain::analysis::AnalysisResult;
use steward_core::domain::message::{Message, MessageId, MessageState};
use steward_core::errors::{LifecycleError, ToolError};
use steward_core::execution::{ApprovalExecutionEngine, ExecutionReport};
use steward_core::inbox::{FolderArchive, MessageArchive};
use steward_core::lifecycle::{LifecycleEvent, MessageLifecycle};
use tracing::{error, info};

use crate::brain::{LoopOutcome, ReasoningLoop};
use crate::llm::LlmClient;
use crate::tools::ToolRegistry;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedMessage {
    pub report: ExecutionReport,
    pub archived_to: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedMessage {
    pub message_id: MessageId,
    pub sender: String,
    pub analysis: AnalysisResult,
    pub report: ExecutionReport,
    pub archived_to: Option<PathBuf>,
    pub state: MessageState,
}

pub struct MessageCoordinator {
    reasoning: ReasoningLoop,
    engine: ApprovalExecutionEngine,
    archive: Arc<dyn MessageArchive>,
    lifecycle: MessageLifecycle,
}

impl MessageCoordinator {
    pub fn new(
        reasoning: ReasoningLoop,
        engine: ApprovalExecutionEngine,
        archive: Arc<dyn MessageArchive>,
    ) -> Self {
        Self { reasoning, engine, archive, lifecycle: MessageLifecycle }
    }

    /// Wires the built-in tools and the vault-backed stores from configuration. Fails only
    /// if the tool catalog itself is inconsistent.
    pub fn from_config(
        config: &AppConfig,
        client: Arc<dyn LlmClient>,
        surface: Arc<dyn ApprovalSurface>,
    ) -> Result<Self, ToolError> {
        let layout = config.vault.layout();
        let registry = Arc::new(ToolRegistry::with_builtin_skills()?);
        let reasoning = ReasoningLoop::from_config(client, registry, config);
        let engine = ApprovalExecutionEngine::new(
            surface,
            Arc::new(FileArtifactStore::new(layout.actions.clone())),
            Arc::new(FileAuditStore::new(layout.logs.clone())),
        );
        Ok(Self::new(reasoning, engine, Arc::new(FolderArchive::new(layout.processed))))
    }

    pub fn reasoning(&self) -> &ReasoningLoop {
        &self.reasoning
    }

    /// NEW → ANALYZED. Only an unreadable body (or a message in the wrong state) fails.
    pub async fn analyze(&self, message: &mut Message) -> Result<LoopOutcome, LifecycleError> {
        let result = self.try_analyze(message).await;
        result.map_err(|lifecycle_error| self.report_failure(message, lifecycle_error))
    }

    async fn try_analyze(&self, message: &mut Message) -> Result<LoopOutcome, LifecycleError> {
        MessageLifecycle::target(message.state(), LifecycleEvent::AnalysisCompleted)?;
        let body = message.body_text()?.to_string();
        let outcome = self.reasoning.analyze(message.id(), &message.sender, &body).await;
        self.lifecycle.apply(message, LifecycleEvent::AnalysisCompleted)?;
        Ok(outcome)
    }

    /// ANALYZED → RESOLVED. Individual action failures are part of the report; only audit
    /// persistence and archival failures stop the transition.
    pub async fn resolve(
        &self,
        message: &mut Message,
        analysis: &AnalysisResult,
    ) -> Result<ResolvedMessage, LifecycleError> {
        let result = self.try_resolve(message, analysis).await;
        result.map_err(|lifecycle_error| self.report_failure(message, lifecycle_error))
    }

    async fn try_resolve(
        &self,
        message: &mut Message,
        analysis: &AnalysisResult,
    ) -> Result<ResolvedMessage, LifecycleError> {
        MessageLifecycle::target(message.state(), LifecycleEvent::ResolutionCompleted)?;
        let report = self.engine.run(message, analysis).await?;
        let archived_to = self.archive.archive(message)?;
        self.lifecycle.apply(message, LifecycleEvent::ResolutionCompleted)?;
        Ok(ResolvedMessage { report, archived_to })
    }

    pub async fn process(&self, message: &mut Message) -> Result<ProcessedMessage, LifecycleError> {
        let outcome = self.analyze(message).await?;
        let resolved = self.resolve(message, &outcome.analysis).await?;

        info!(
            event_name = "lifecycle.message_resolved",
            message_id = %message.id(),
            actions = resolved.report.actions.len(),
            archived = resolved.archived_to.is_some(),
            "message resolved"
        );

        Ok(ProcessedMessage {
            message_id: message.id().clone(),
            sender: message.sender.clone(),
            analysis: outcome.analysis,
            report: resolved.report,
            archived_to: resolved.archived_to,
            state: message.state(),
        })
    }

    fn report_failure(&self, message: &Message, lifecycle_error: LifecycleError) -> LifecycleError {
        error!(
            event_name = "lifecycle.message_failed",
            message_id = %message.id(),
            state = message.state().as_str(),
            error_class = lifecycle_error.error_class(),
            error = %lifecycle_error,
            "{}",
            lifecycle_error.operator_message()
        );
        lifecycle_error
    }
}
