//! Approval and execution of proposed actions.
//!
//! One run per analyzed message walks `PendingReview → Executing → Done`:
//! every action gets a decision first, then approved actions are written in order, then a
//! single audit record covering all of them is persisted. An artifact failure only marks
//! that action `FAILED`; only the audit write can fail the run.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::approvals::{ApprovalPrompt, ApprovalSurface};
use crate::artifacts::{ArtifactRequest, ArtifactStore};
use crate::audit::{AuditEntry, AuditRecord, AuditStore};
use crate::domain::action::{derive_actions, ActionOutcome, ProposedAction};
use crate::domain::analysis::AnalysisResult;
use crate::domain::message::Message;
use crate::errors::AuditPersistError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPhase {
    PendingReview,
    Executing,
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub actions: Vec<ProposedAction>,
    pub record: AuditRecord,
    pub audit_path: PathBuf,
    pub phase: ExecutionPhase,
}

impl ExecutionReport {
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        self.record.actions.iter().filter_map(|entry| entry.artifact_path.clone()).collect()
    }

    pub fn count(&self, outcome: ActionOutcome) -> usize {
        self.record.actions.iter().filter(|entry| entry.outcome == outcome).count()
    }
}

#[derive(Clone)]
pub struct ApprovalExecutionEngine {
    surface: Arc<dyn ApprovalSurface>,
    artifacts: Arc<dyn ArtifactStore>,
    audit: Arc<dyn AuditStore>,
}

impl ApprovalExecutionEngine {
    pub fn new(
        surface: Arc<dyn ApprovalSurface>,
        artifacts: Arc<dyn ArtifactStore>,
        audit: Arc<dyn AuditStore>,
    ) -> Self {
        Self { surface, artifacts, audit }
    }

    pub async fn run(
        &self,
        message: &Message,
        analysis: &AnalysisResult,
    ) -> Result<ExecutionReport, AuditPersistError> {
        let mut actions = derive_actions(analysis);
        let total = actions.len();
        enter_phase(message, ExecutionPhase::PendingReview, total);

        for action in actions.iter_mut() {
            let prompt =
                ApprovalPrompt { sequence: action.sequence, total, request: action.request() };
            let approved = self.surface.request_decision(&prompt).await;
            action.record_decision(approved);
            info!(
                event_name = "approval.decision_recorded",
                message_id = %message.id(),
                sequence = action.sequence,
                kind = action.kind.as_str(),
                approved,
                "approval decision recorded"
            );
        }

        enter_phase(message, ExecutionPhase::Executing, total);
        let entries = actions
            .iter()
            .map(|action| self.execute(message, analysis, action))
            .collect::<Vec<_>>();

        let record = AuditRecord::new(
            message.id().clone(),
            message.sender.clone(),
            analysis.priority,
            analysis.category,
            entries,
        );
        let audit_path = match self.audit.append(&record) {
            Ok(path) => path,
            Err(persist_error) => {
                error!(
                    event_name = "audit.persist_failed",
                    message_id = %message.id(),
                    error = %persist_error,
                    "audit record could not be persisted"
                );
                return Err(persist_error);
            }
        };

        enter_phase(message, ExecutionPhase::Done, total);
        info!(
            event_name = "audit.record_persisted",
            message_id = %message.id(),
            path = %audit_path.display(),
            actions = record.actions.len(),
            "audit record persisted"
        );

        Ok(ExecutionReport { actions, record, audit_path, phase: ExecutionPhase::Done })
    }

    fn execute(
        &self,
        message: &Message,
        analysis: &AnalysisResult,
        action: &ProposedAction,
    ) -> AuditEntry {
        let approved = action.approved().unwrap_or(false);
        let mut entry = AuditEntry {
            sequence: action.sequence,
            action: action.request(),
            approved,
            outcome: ActionOutcome::Skipped,
            artifact_path: None,
            error: None,
        };
        if !approved {
            return entry;
        }

        let request = ArtifactRequest {
            message_id: message.id().clone(),
            sequence: action.sequence,
            kind: action.kind,
            payload: action.payload.clone(),
            sender: message.sender.clone(),
            priority: analysis.priority,
            category: analysis.category,
            created_at: Utc::now(),
        };

        match self.artifacts.write(&request) {
            Ok(path) => {
                info!(
                    event_name = "execution.action_succeeded",
                    message_id = %message.id(),
                    sequence = action.sequence,
                    path = %path.display(),
                    "action artifact written"
                );
                entry.outcome = ActionOutcome::Success;
                entry.artifact_path = Some(path);
            }
            Err(write_error) => {
                warn!(
                    event_name = "execution.action_failed",
                    message_id = %message.id(),
                    sequence = action.sequence,
                    error = %write_error,
                    "action artifact could not be written"
                );
                entry.outcome = ActionOutcome::Failed;
                entry.error = Some(write_error.to_string());
            }
        }
        entry
    }
}

fn enter_phase(message: &Message, phase: ExecutionPhase, actions: usize) {
    debug!(
        event_name = "execution.phase_entered",
        message_id = %message.id(),
        phase = ?phase,
        actions,
        "execution phase entered"
    );
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::ApprovalExecutionEngine;
    use crate::approvals::{AutoApprove, ObserveOnly, ScriptedApproval};
    use crate::artifacts::{FileArtifactStore, InMemoryArtifactStore};
    use crate::audit::{FileAuditStore, InMemoryAuditStore};
    use crate::domain::action::{ActionKind, ActionOutcome};
    use crate::domain::analysis::{AnalysisResult, Category, Priority};
    use crate::domain::message::{Envelope, Message};
    use crate::errors::AuditPersistError;

    fn analysis_for(message: &Message, reply: Option<&str>, tasks: &[&str]) -> AnalysisResult {
        AnalysisResult {
            message_id: message.id().clone(),
            summary: "Budget review".to_owned(),
            priority: Priority::High,
            category: Category::Work,
            suggested_reply: reply.map(str::to_owned),
            tasks: tasks.iter().map(|task| (*task).to_owned()).collect(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn approved_then_rejected_yields_success_then_skipped() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let message = Message::from_envelope(Envelope::typed("Sarah", "Can you review it?"));
        let analysis = analysis_for(&message, Some("Sure, on it."), &["Review the report"]);
        let surface = ScriptedApproval::new([true, false]);
        let audit = InMemoryAuditStore::default();
        let engine = ApprovalExecutionEngine::new(
            Arc::new(surface.clone()),
            Arc::new(FileArtifactStore::new(dir.path())),
            Arc::new(audit.clone()),
        );

        let report = engine.run(&message, &analysis).await.map_err(|err| err.to_string())?;

        assert_eq!(report.record.outcomes(), vec![ActionOutcome::Success, ActionOutcome::Skipped]);
        assert_eq!(report.record.actions.len(), report.actions.len());
        let files = fs::read_dir(dir.path()).map_err(|err| err.to_string())?.count();
        assert_eq!(files, 1);
        assert_eq!(report.artifact_paths().len(), 1);

        let kinds = surface.seen().iter().map(|prompt| prompt.kind()).collect::<Vec<_>>();
        assert_eq!(kinds, vec![ActionKind::SendReply, ActionKind::CreateTask]);
        assert_eq!(audit.records().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn one_failed_write_does_not_block_siblings() -> Result<(), String> {
        let message = Message::from_envelope(Envelope::typed("Sarah", "body"));
        let analysis = analysis_for(&message, Some("Reply"), &["Task one", "Task two"]);
        let artifacts = InMemoryArtifactStore::failing_on([2]);
        let engine = ApprovalExecutionEngine::new(
            Arc::new(AutoApprove),
            Arc::new(artifacts.clone()),
            Arc::new(InMemoryAuditStore::default()),
        );

        let report = engine.run(&message, &analysis).await.map_err(|err| err.to_string())?;

        assert_eq!(
            report.record.outcomes(),
            vec![ActionOutcome::Success, ActionOutcome::Failed, ActionOutcome::Success]
        );
        assert!(report.record.actions[1].error.is_some());
        assert_eq!(artifacts.written().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn observe_mode_writes_only_the_audit_record() -> Result<(), String> {
        let message = Message::from_envelope(Envelope::typed("Sarah", "body"));
        let analysis = analysis_for(&message, Some("Reply"), &["Task"]);
        let artifacts = InMemoryArtifactStore::default();
        let engine = ApprovalExecutionEngine::new(
            Arc::new(ObserveOnly),
            Arc::new(artifacts.clone()),
            Arc::new(InMemoryAuditStore::default()),
        );

        let report = engine.run(&message, &analysis).await.map_err(|err| err.to_string())?;

        assert_eq!(report.count(ActionOutcome::Skipped), 2);
        assert!(artifacts.written().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn no_actions_still_produce_an_empty_audit_record() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let message = Message::from_envelope(Envelope::typed("Sarah", "body"));
        let analysis = analysis_for(&message, None, &[]);
        let audit = FileAuditStore::new(dir.path());
        let engine = ApprovalExecutionEngine::new(
            Arc::new(AutoApprove),
            Arc::new(InMemoryArtifactStore::default()),
            Arc::new(audit.clone()),
        );

        let report = engine.run(&message, &analysis).await.map_err(|err| err.to_string())?;

        assert!(report.record.actions.is_empty());
        assert!(report.audit_path.exists());
        let loaded = audit.load(message.id()).map_err(|err| err.to_string())?;
        assert_eq!(loaded.message_id, *message.id());
        Ok(())
    }

    #[tokio::test]
    async fn audit_failure_is_surfaced_after_artifacts_are_written() {
        let message = Message::from_envelope(Envelope::typed("Sarah", "body"));
        let analysis = analysis_for(&message, None, &["Task"]);
        let artifacts = InMemoryArtifactStore::default();
        let engine = ApprovalExecutionEngine::new(
            Arc::new(AutoApprove),
            Arc::new(artifacts.clone()),
            Arc::new(InMemoryAuditStore::unavailable("disk full")),
        );

        let result = engine.run(&message, &analysis).await;

        assert!(matches!(result, Err(AuditPersistError::Io { .. })));
        assert_eq!(artifacts.written().len(), 1);
    }
}
