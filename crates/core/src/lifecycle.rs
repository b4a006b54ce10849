use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::message::{Message, MessageState};
use crate::errors::LifecycleTransitionError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    AnalysisCompleted,
    ResolutionCompleted,
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisCompleted => "analysis_completed",
            Self::ResolutionCompleted => "resolution_completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: MessageState,
    pub to: MessageState,
    pub event: LifecycleEvent,
}

/// The only writer of [`Message`] state: NEW → ANALYZED → RESOLVED, never skipping a step.
#[derive(Clone, Copy, Debug, Default)]
pub struct MessageLifecycle;

impl MessageLifecycle {
    pub fn target(
        current: MessageState,
        event: LifecycleEvent,
    ) -> Result<MessageState, LifecycleTransitionError> {
        let to = match event {
            LifecycleEvent::AnalysisCompleted => MessageState::Analyzed,
            LifecycleEvent::ResolutionCompleted => MessageState::Resolved,
        };
        let allowed = matches!(
            (current, to),
            (MessageState::New, MessageState::Analyzed)
                | (MessageState::Analyzed, MessageState::Resolved)
        );
        if allowed {
            Ok(to)
        } else {
            Err(LifecycleTransitionError { from: current, to })
        }
    }

    pub fn apply(
        &self,
        message: &mut Message,
        event: LifecycleEvent,
    ) -> Result<TransitionOutcome, LifecycleTransitionError> {
        let from = message.state();
        let result = Self::target(from, event).and_then(|to| {
            message.transition_to(to)?;
            Ok(TransitionOutcome { from, to, event })
        });

        match &result {
            Ok(outcome) => info!(
                event_name = "lifecycle.transition_applied",
                message_id = %message.id(),
                from = outcome.from.as_str(),
                to = outcome.to.as_str(),
                trigger = event.as_str(),
                "message state advanced"
            ),
            Err(error) => warn!(
                event_name = "lifecycle.transition_rejected",
                message_id = %message.id(),
                trigger = event.as_str(),
                error = %error,
                "message state transition rejected"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::{LifecycleEvent, MessageLifecycle};
    use crate::domain::message::{Envelope, Message, MessageState};

    #[test]
    fn events_walk_the_message_forward() {
        let lifecycle = MessageLifecycle;
        let mut message = Message::from_envelope(Envelope::typed("Sarah", "hello"));

        let analyzed = lifecycle.apply(&mut message, LifecycleEvent::AnalysisCompleted);
        assert_eq!(analyzed.map(|outcome| outcome.to), Ok(MessageState::Analyzed));

        let resolved = lifecycle.apply(&mut message, LifecycleEvent::ResolutionCompleted);
        assert_eq!(resolved.map(|outcome| outcome.from), Ok(MessageState::Analyzed));
        assert_eq!(message.state(), MessageState::Resolved);
    }

    #[test]
    fn resolving_a_new_message_is_rejected_and_state_is_kept() {
        let lifecycle = MessageLifecycle;
        let mut message = Message::from_envelope(Envelope::typed("Sarah", "hello"));

        let error = lifecycle.apply(&mut message, LifecycleEvent::ResolutionCompleted);
        assert!(error.is_err());
        assert_eq!(message.state(), MessageState::New);
    }

    #[test]
    fn analysis_cannot_be_applied_twice() {
        let analyzed =
            MessageLifecycle::target(MessageState::Analyzed, LifecycleEvent::AnalysisCompleted);
        assert!(analyzed.is_err());
        let resolved =
            MessageLifecycle::target(MessageState::Resolved, LifecycleEvent::ResolutionCompleted);
        assert!(resolved.is_err());
    }
}
