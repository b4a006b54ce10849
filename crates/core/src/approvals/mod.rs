//! Approval surfaces: the pluggable capability that turns one proposed action into a
//! yes/no decision. Waiting on a surface is the only place the pipeline suspends.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ApprovalMode;
use crate::domain::action::{ActionKind, ActionRequest};

/// What the operator is asked about: the action itself plus its position in the batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPrompt {
    pub sequence: u32,
    pub total: usize,
    pub request: ActionRequest,
}

impl ApprovalPrompt {
    pub fn kind(&self) -> ActionKind {
        self.request.kind
    }

    pub fn payload(&self) -> &str {
        &self.request.payload
    }
}

#[async_trait]
pub trait ApprovalSurface: Send + Sync {
    async fn request_decision(&self, prompt: &ApprovalPrompt) -> bool;
}

/// Batch mode: every action is approved.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalSurface for AutoApprove {
    async fn request_decision(&self, _prompt: &ApprovalPrompt) -> bool {
        true
    }
}

/// Observation only: every action is rejected, so nothing is ever executed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ObserveOnly;

#[async_trait]
impl ApprovalSurface for ObserveOnly {
    async fn request_decision(&self, _prompt: &ApprovalPrompt) -> bool {
        false
    }
}

/// Test double answering from a fixed script. Once the script runs out it rejects.
#[derive(Clone, Default)]
pub struct ScriptedApproval {
    decisions: Arc<Mutex<VecDeque<bool>>>,
    seen: Arc<Mutex<Vec<ApprovalPrompt>>>,
}

impl ScriptedApproval {
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            decisions: Arc::new(Mutex::new(decisions.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<ApprovalPrompt> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl ApprovalSurface for ScriptedApproval {
    async fn request_decision(&self, prompt: &ApprovalPrompt) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(prompt.clone()),
            Err(poisoned) => poisoned.into_inner().push(prompt.clone()),
        }
        let next = match self.decisions.lock() {
            Ok(mut decisions) => decisions.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or(false)
    }
}

/// The non-interactive surface for a mode. Interactive prompting needs a terminal and is
/// supplied by the caller.
pub fn non_interactive_surface(mode: ApprovalMode) -> Option<Arc<dyn ApprovalSurface>> {
    match mode {
        ApprovalMode::AutoApprove => Some(Arc::new(AutoApprove)),
        ApprovalMode::Observe => Some(Arc::new(ObserveOnly)),
        ApprovalMode::Interactive => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        non_interactive_surface, ApprovalPrompt, ApprovalSurface, AutoApprove, ObserveOnly,
        ScriptedApproval,
    };
    use crate::config::ApprovalMode;
    use crate::domain::action::{ActionKind, ActionRequest};

    fn prompt(sequence: u32) -> ApprovalPrompt {
        ApprovalPrompt {
            sequence,
            total: 2,
            request: ActionRequest { kind: ActionKind::CreateTask, payload: "Review".to_owned() },
        }
    }

    #[tokio::test]
    async fn fixed_surfaces_answer_consistently() {
        assert!(AutoApprove.request_decision(&prompt(1)).await);
        assert!(!ObserveOnly.request_decision(&prompt(1)).await);
    }

    #[tokio::test]
    async fn scripted_surface_replays_then_rejects() {
        let surface = ScriptedApproval::new([true, false]);
        assert!(surface.request_decision(&prompt(1)).await);
        assert!(!surface.request_decision(&prompt(2)).await);
        assert!(!surface.request_decision(&prompt(3)).await);

        let seen = surface.seen().iter().map(|prompt| prompt.sequence).collect::<Vec<_>>();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn interactive_mode_has_no_built_in_surface() {
        assert!(non_interactive_surface(ApprovalMode::Interactive).is_none());
        assert!(non_interactive_surface(ApprovalMode::Observe).is_some());
    }
}
