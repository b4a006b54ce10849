use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::action::{ActionOutcome, ActionRequest};
use crate::domain::analysis::{Category, Priority};
use crate::domain::message::MessageId;
use crate::errors::AuditPersistError;

/// Bumped whenever a field changes meaning. Field names themselves never change.
pub const AUDIT_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: u32,
    pub action: ActionRequest,
    pub approved: bool,
    pub outcome: ActionOutcome,
    pub artifact_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// One record per processed message, covering the final outcome of every proposed action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub schema_version: u32,
    pub message_id: MessageId,
    pub recorded_at: DateTime<Utc>,
    pub sender: String,
    pub priority: Priority,
    pub category: Category,
    pub actions: Vec<AuditEntry>,
}

impl AuditRecord {
    pub fn new(
        message_id: MessageId,
        sender: impl Into<String>,
        priority: Priority,
        category: Category,
        actions: Vec<AuditEntry>,
    ) -> Self {
        Self {
            schema_version: AUDIT_SCHEMA_VERSION,
            message_id,
            recorded_at: Utc::now(),
            sender: sender.into(),
            priority,
            category,
            actions,
        }
    }

    pub fn outcomes(&self) -> Vec<ActionOutcome> {
        self.actions.iter().map(|entry| entry.outcome).collect()
    }
}

/// Append-only store. A record is either fully persisted or not at all.
pub trait AuditStore: Send + Sync {
    fn append(&self, record: &AuditRecord) -> Result<PathBuf, AuditPersistError>;
}

/// `<dir>/audit-<message_id>.json`, written through a synced temporary file and a rename.
#[derive(Clone, Debug)]
pub struct FileAuditStore {
    dir: PathBuf,
}

impl FileAuditStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn record_path(&self, message_id: &MessageId) -> PathBuf {
        self.dir.join(format!("audit-{}.json", message_id.0))
    }

    pub fn load(&self, message_id: &MessageId) -> Result<AuditRecord, AuditPersistError> {
        let path = self.record_path(message_id);
        let raw = fs::read_to_string(&path).map_err(|error| io_error(&path, error))?;
        serde_json::from_str(&raw).map_err(|error| AuditPersistError::Serialize(error.to_string()))
    }
}

impl AuditStore for FileAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<PathBuf, AuditPersistError> {
        let path = self.record_path(&record.message_id);
        if path.exists() {
            return Err(AuditPersistError::AlreadyRecorded(record.message_id.clone()));
        }

        let json = serde_json::to_vec_pretty(record)
            .map_err(|error| AuditPersistError::Serialize(error.to_string()))?;

        let tmp_path = self.dir.join(format!(".audit-{}.json.tmp", record.message_id.0));
        if let Err(error) = write_synced(&tmp_path, &json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(&tmp_path, error));
        }

        if path.exists() {
            let _ = fs::remove_file(&tmp_path);
            return Err(AuditPersistError::AlreadyRecorded(record.message_id.clone()));
        }
        if let Err(error) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(&path, error));
        }

        Ok(path)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file: File = OpenOptions::new().write(true).create(true).truncate(true).open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn io_error(path: &Path, error: std::io::Error) -> AuditPersistError {
    AuditPersistError::Io { path: path.to_path_buf(), reason: error.to_string() }
}

#[derive(Clone, Default)]
pub struct InMemoryAuditStore {
    records: Arc<Mutex<Vec<AuditRecord>>>,
    unavailable: Option<String>,
}

impl InMemoryAuditStore {
    /// A store whose every append fails with an I/O error carrying `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { records: Arc::default(), unavailable: Some(reason.into()) }
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, record: &AuditRecord) -> Result<PathBuf, AuditPersistError> {
        let path = PathBuf::from(format!("memory://audit-{}.json", record.message_id.0));
        if let Some(reason) = &self.unavailable {
            return Err(AuditPersistError::Io { path, reason: reason.clone() });
        }

        let mut records = match self.records.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        if records.iter().any(|existing| existing.message_id == record.message_id) {
            return Err(AuditPersistError::AlreadyRecorded(record.message_id.clone()));
        }
        records.push(record.clone());
        Ok(path)
    }
}
