use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::action::ActionKind;
use crate::domain::analysis::{Category, Priority};
use crate::domain::message::MessageId;
use crate::errors::ActionExecutionError;

/// Everything needed to render one reply draft or task record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRequest {
    pub message_id: MessageId,
    pub sequence: u32,
    pub kind: ActionKind,
    pub payload: String,
    pub sender: String,
    pub priority: Priority,
    pub category: Category,
    pub created_at: DateTime<Utc>,
}

impl ArtifactRequest {
    /// Keyed by message id and sequence, so one action maps to exactly one file name.
    pub fn file_name(&self) -> String {
        format!("{}-{:02}-{}.md", self.message_id.0, self.sequence, self.kind.artifact_suffix())
    }

    pub fn render(&self) -> String {
        let stamp = self.created_at.format("%Y-%m-%d %H:%M:%S UTC");
        match self.kind {
            ActionKind::SendReply => format!(
                "# Reply Draft\n\n\
                 **Generated**: {stamp}\n\
                 **To**: {sender}\n\
                 **Priority**: {priority}\n\
                 **Message**: {id}\n\n\
                 ---\n\n\
                 {payload}\n\n\
                 ---\n\n\
                 *Note: This is a draft. Review and send manually.*\n",
                sender = self.sender,
                priority = self.priority,
                id = self.message_id,
                payload = self.payload.trim(),
            ),
            ActionKind::CreateTask => format!(
                "# Task\n\n\
                 **Created**: {stamp}\n\
                 **Priority**: {priority}\n\n\
                 ---\n\n\
                 {payload}\n\n\
                 ---\n\n\
                 **Source**: message from {sender} ({id})\n\
                 **Category**: {category}\n",
                priority = self.priority,
                payload = self.payload.trim(),
                sender = self.sender,
                id = self.message_id,
                category = self.category,
            ),
        }
    }
}

/// Create-only storage for action artifacts. Writing the same request twice must fail.
pub trait ArtifactStore: Send + Sync {
    fn write(&self, request: &ArtifactRequest) -> Result<PathBuf, ActionExecutionError>;
}

#[derive(Clone, Debug)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactStore for FileArtifactStore {
    fn write(&self, request: &ArtifactRequest) -> Result<PathBuf, ActionExecutionError> {
        let path = self.dir.join(request.file_name());
        let mut file =
            OpenOptions::new().write(true).create_new(true).open(&path).map_err(|error| {
                if error.kind() == ErrorKind::AlreadyExists {
                    ActionExecutionError::AlreadyExists { path: path.clone() }
                } else {
                    ActionExecutionError::Io { path: path.clone(), reason: error.to_string() }
                }
            })?;

        fill_or_discard(&path, || {
            file.write_all(request.render().as_bytes())?;
            file.sync_all()
        })?;

        Ok(path)
    }
}

/// Runs `fill` against a freshly created file and removes the file again if it fails, so a
/// failed action never leaves a partial artifact behind.
fn fill_or_discard(
    path: &Path,
    fill: impl FnOnce() -> io::Result<()>,
) -> Result<(), ActionExecutionError> {
    fill().map_err(|error| {
        if let Err(cleanup) = fs::remove_file(path) {
            warn!(
                event_name = "execution.artifact_cleanup_failed",
                path = %path.display(),
                error = %cleanup,
                "partial artifact could not be removed"
            );
        }
        ActionExecutionError::Io { path: path.to_path_buf(), reason: error.to_string() }
    })
}

/// Test double that keeps rendered artifacts in memory and can fail chosen sequences.
#[derive(Clone, Default)]
pub struct InMemoryArtifactStore {
    written: Arc<Mutex<Vec<(PathBuf, String)>>>,
    failing_sequences: BTreeSet<u32>,
}

impl InMemoryArtifactStore {
    pub fn failing_on(sequences: impl IntoIterator<Item = u32>) -> Self {
        Self { written: Arc::default(), failing_sequences: sequences.into_iter().collect() }
    }

    pub fn written(&self) -> Vec<(PathBuf, String)> {
        match self.written.lock() {
            Ok(written) => written.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn write(&self, request: &ArtifactRequest) -> Result<PathBuf, ActionExecutionError> {
        let path = PathBuf::from(format!("memory://{}", request.file_name()));
        if self.failing_sequences.contains(&request.sequence) {
            return Err(ActionExecutionError::Io { path, reason: "simulated write failure".into() });
        }

        let mut written = match self.written.lock() {
            Ok(written) => written,
            Err(poisoned) => poisoned.into_inner(),
        };
        if written.iter().any(|(existing, _)| existing == &path) {
            return Err(ActionExecutionError::AlreadyExists { path });
        }
        written.push((path.clone(), request.render()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io;

    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use super::{fill_or_discard, ArtifactRequest, ArtifactStore, FileArtifactStore};
    use crate::domain::action::ActionKind;
    use crate::domain::analysis::{Category, Priority};
    use crate::domain::message::MessageId;
    use crate::errors::ActionExecutionError;

    fn request(kind: ActionKind, sequence: u32) -> ArtifactRequest {
        ArtifactRequest {
            message_id: MessageId("msg-7".to_owned()),
            sequence,
            kind,
            payload: "Can you review the report by Friday?".to_owned(),
            sender: "Sarah".to_owned(),
            priority: Priority::Medium,
            category: Category::Work,
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).single().unwrap_or_default(),
        }
    }

    #[test]
    fn reply_drafts_are_marked_as_drafts() {
        let rendered = request(ActionKind::SendReply, 1).render();
        assert!(rendered.starts_with("# Reply Draft"));
        assert!(rendered.contains("**To**: Sarah"));
        assert!(rendered.contains("**Generated**: 2026-03-02 09:30:00 UTC"));
        assert!(rendered.contains("This is a draft. Review and send manually."));
    }

    #[test]
    fn task_records_carry_source_and_category() {
        let rendered = request(ActionKind::CreateTask, 2).render();
        assert!(rendered.starts_with("# Task"));
        assert!(rendered.contains("**Source**: message from Sarah (msg-7)"));
        assert!(rendered.contains("**Category**: WORK"));
    }

    #[test]
    fn file_store_is_create_only() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let store = FileArtifactStore::new(dir.path());
        let task = request(ActionKind::CreateTask, 2);

        let path = store.write(&task).map_err(|err| err.to_string())?;
        assert_eq!(path, dir.path().join("msg-7-02-task.md"));
        let contents = fs::read_to_string(&path).map_err(|err| err.to_string())?;
        assert!(contents.contains("review the report"));

        assert_eq!(store.write(&task), Err(ActionExecutionError::AlreadyExists { path }));
        Ok(())
    }

    #[test]
    fn missing_directory_is_an_io_failure() {
        let store = FileArtifactStore::new("/nonexistent/steward/actions");
        let result = store.write(&request(ActionKind::SendReply, 1));
        assert!(matches!(result, Err(ActionExecutionError::Io { .. })));
    }

    #[test]
    fn failed_fill_removes_the_partial_file() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let path = dir.path().join("msg-7-01-reply.md");
        fs::write(&path, "# Reply Dr").map_err(|err| err.to_string())?;

        let result = fill_or_discard(&path, || Err(io::Error::other("No space left on device")));

        match result {
            Err(ActionExecutionError::Io { reason, .. }) => assert!(reason.contains("No space")),
            other => return Err(format!("expected an io failure, got {other:?}")),
        }
        assert!(!path.exists());
        Ok(())
    }
}
