use serde::{Deserialize, Serialize};

use crate::domain::analysis::AnalysisResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    SendReply,
    CreateTask,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendReply => "SEND_REPLY",
            Self::CreateTask => "CREATE_TASK",
        }
    }

    pub fn artifact_suffix(&self) -> &'static str {
        match self {
            Self::SendReply => "reply",
            Self::CreateTask => "task",
        }
    }
}

/// What the approval surface is shown, and what the audit record keeps per action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub payload: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub sequence: u32,
    pub kind: ActionKind,
    pub payload: String,
    approved: Option<bool>,
}

impl ProposedAction {
    pub fn new(sequence: u32, kind: ActionKind, payload: impl Into<String>) -> Self {
        Self { sequence, kind, payload: payload.into(), approved: None }
    }

    pub fn request(&self) -> ActionRequest {
        ActionRequest { kind: self.kind, payload: self.payload.clone() }
    }

    pub fn approved(&self) -> Option<bool> {
        self.approved
    }

    /// Records the operator decision. Returns `false` without changing anything if a
    /// decision was already recorded.
    pub fn record_decision(&mut self, approved: bool) -> bool {
        if self.approved.is_some() {
            return false;
        }
        self.approved = Some(approved);
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOutcome {
    Success,
    Failed,
    Skipped,
}

impl ActionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

/// Reply first (when present), then one task action per task in extraction order.
pub fn derive_actions(analysis: &AnalysisResult) -> Vec<ProposedAction> {
    let reply = analysis
        .suggested_reply
        .as_deref()
        .filter(|reply| !reply.trim().is_empty())
        .map(|reply| (ActionKind::SendReply, reply.to_string()));
    let tasks = analysis
        .tasks
        .iter()
        .filter(|task| !task.trim().is_empty())
        .map(|task| (ActionKind::CreateTask, task.clone()));

    reply
        .into_iter()
        .chain(tasks)
        .enumerate()
        .map(|(index, (kind, payload))| ProposedAction::new(index as u32 + 1, kind, payload))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{derive_actions, ActionKind, ProposedAction};
    use crate::domain::analysis::{AnalysisResult, Category, Priority};
    use crate::domain::message::MessageId;

    fn analysis(reply: Option<&str>, tasks: &[&str]) -> AnalysisResult {
        AnalysisResult {
            message_id: MessageId("msg-actions".to_string()),
            summary: "summary".to_string(),
            priority: Priority::Medium,
            category: Category::Work,
            suggested_reply: reply.map(str::to_string),
            tasks: tasks.iter().map(|task| task.to_string()).collect(),
            notes: String::new(),
        }
    }

    #[test]
    fn reply_precedes_tasks_and_tasks_keep_extraction_order() {
        let actions =
            derive_actions(&analysis(Some("On it."), &["Review report", "Book room", "Call Sam"]));

        let kinds = actions.iter().map(|action| action.kind).collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![
                ActionKind::SendReply,
                ActionKind::CreateTask,
                ActionKind::CreateTask,
                ActionKind::CreateTask
            ]
        );
        assert_eq!(actions[1].payload, "Review report");
        assert_eq!(actions[3].payload, "Call Sam");
        assert_eq!(actions.iter().map(|a| a.sequence).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(actions.iter().all(|action| action.approved().is_none()));
    }

    #[test]
    fn no_reply_and_no_tasks_derives_nothing() {
        assert!(derive_actions(&analysis(None, &[])).is_empty());
        assert!(derive_actions(&analysis(Some("   "), &[])).is_empty());
    }

    #[test]
    fn derivation_is_deterministic() {
        let input = analysis(Some("Sure."), &["a task", "another task"]);
        assert_eq!(derive_actions(&input), derive_actions(&input));
    }

    #[test]
    fn decision_is_recorded_exactly_once() {
        let mut action = ProposedAction::new(1, ActionKind::CreateTask, "x");
        assert!(action.record_decision(false));
        assert!(!action.record_decision(true));
        assert_eq!(action.approved(), Some(false));
    }
}
