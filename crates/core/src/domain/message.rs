use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AcquisitionError, LifecycleTransitionError};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn generate() -> Self {
        Self(format!("msg-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    Folder,
    Chat,
}

impl MessageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Chat => "chat",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageState {
    New,
    Analyzed,
    Resolved,
}

impl MessageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Analyzed => "ANALYZED",
            Self::Resolved => "RESOLVED",
        }
    }
}

/// Raw message bytes as acquired. Decoding to text is deferred to analysis so an
/// unreadable body surfaces as an acquisition failure of that one message.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageBody(Vec<u8>);

impl MessageBody {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.0)
    }
}

impl From<String> for MessageBody {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&str> for MessageBody {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Debug for MessageBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageBody").field("len", &self.0.len()).finish()
    }
}

/// What an acquisition source hands to the pipeline. The core assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub source: MessageSource,
    pub sender: String,
    pub body: MessageBody,
    pub received_at: DateTime<Utc>,
    pub origin: Option<PathBuf>,
}

impl Envelope {
    pub fn typed(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: MessageSource::Folder,
            sender: sender.into(),
            body: MessageBody::from(body.into()),
            received_at: Utc::now(),
            origin: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    id: MessageId,
    pub source: MessageSource,
    pub sender: String,
    pub body: MessageBody,
    pub received_at: DateTime<Utc>,
    pub origin: Option<PathBuf>,
    state: MessageState,
}

impl Message {
    pub fn from_envelope(envelope: Envelope) -> Self {
        Self::with_id(MessageId::generate(), envelope)
    }

    pub fn with_id(id: MessageId, envelope: Envelope) -> Self {
        Self {
            id,
            source: envelope.source,
            sender: envelope.sender,
            body: envelope.body,
            received_at: envelope.received_at,
            origin: envelope.origin,
            state: MessageState::New,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn state(&self) -> MessageState {
        self.state
    }

    pub fn body_text(&self) -> Result<&str, AcquisitionError> {
        self.body.text().map_err(|error| AcquisitionError::Unreadable {
            message_id: self.id.clone(),
            reason: format!("message body is not valid UTF-8: {error}"),
        })
    }

    pub fn can_transition_to(&self, next: MessageState) -> bool {
        matches!(
            (self.state, next),
            (MessageState::New, MessageState::Analyzed)
                | (MessageState::Analyzed, MessageState::Resolved)
        )
    }

    pub(crate) fn transition_to(
        &mut self,
        next: MessageState,
    ) -> Result<(), LifecycleTransitionError> {
        if self.can_transition_to(next) {
            self.state = next;
            return Ok(());
        }

        Err(LifecycleTransitionError { from: self.state, to: next })
    }
}

#[cfg(test)]
mod tests {
    use super::{Envelope, Message, MessageBody, MessageState};

    #[test]
    fn message_starts_new_and_moves_strictly_forward() {
        let mut message = Message::from_envelope(Envelope::typed("Sarah", "hello"));
        assert_eq!(message.state(), MessageState::New);

        assert!(message.transition_to(MessageState::Resolved).is_err());
        assert!(message.transition_to(MessageState::Analyzed).is_ok());
        assert!(message.transition_to(MessageState::New).is_err());
        assert!(message.transition_to(MessageState::Resolved).is_ok());
        assert!(message.transition_to(MessageState::Resolved).is_err());
        assert_eq!(message.state(), MessageState::Resolved);
    }

    #[test]
    fn generated_ids_are_unique_within_a_run() {
        let first = Message::from_envelope(Envelope::typed("a", "x"));
        let second = Message::from_envelope(Envelope::typed("a", "x"));
        assert_ne!(first.id(), second.id());
        assert!(first.id().0.starts_with("msg-"));
    }

    #[test]
    fn invalid_utf8_body_is_an_acquisition_error() {
        let mut envelope = Envelope::typed("a", "");
        envelope.body = MessageBody::from_bytes(vec![0xff, 0xfe, 0x00]);
        let message = Message::from_envelope(envelope);

        let error = message.body_text().expect_err("invalid utf-8 must not decode");
        assert!(error.to_string().contains("not valid UTF-8"));
    }
}
