//! Folder acquisition and archival.
//!
//! The inbox hands out [`Envelope`]s in arrival order; the archive relocates a message's
//! source file once it has been resolved.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

use crate::domain::message::{Envelope, Message, MessageBody, MessageSource};
use crate::errors::{AcquisitionError, ArchiveError};

pub const UNKNOWN_SENDER: &str = "Unknown";

const CHAT_SOURCE_MARKER: &str = "**Source**: WhatsApp";
const SENDER_LOOKAHEAD_LINES: usize = 5;

#[derive(Debug)]
pub struct FolderInbox {
    dir: PathBuf,
    extensions: Vec<String>,
    handed_out: HashSet<PathBuf>,
}

impl FolderInbox {
    pub fn new(dir: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            dir: dir.into(),
            extensions: extensions.iter().map(|extension| extension.to_ascii_lowercase()).collect(),
            handed_out: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// New files since the last scan, oldest first. Files that cannot be read are skipped
    /// and offered again on the next scan. A name freed by archival can be handed out again.
    pub fn scan(&mut self) -> Result<Vec<Envelope>, AcquisitionError> {
        self.handed_out.retain(|path| path.exists());

        let entries = fs::read_dir(&self.dir).map_err(|error| AcquisitionError::Io {
            path: self.dir.clone(),
            reason: error.to_string(),
        })?;

        let mut candidates = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.accepts(path))
            .filter(|path| !self.handed_out.contains(path))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|metadata| metadata.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect::<Vec<_>>();
        candidates.sort();

        let mut envelopes = Vec::with_capacity(candidates.len());
        for (modified, path) in candidates {
            match fs::read(&path) {
                Ok(bytes) => {
                    let received_at = DateTime::<Utc>::from(modified);
                    envelopes.push(envelope_from_file(&path, bytes, received_at));
                    self.handed_out.insert(path);
                }
                Err(error) => {
                    warn!(
                        event_name = "inbox.read_failed",
                        path = %path.display(),
                        error = %error,
                        "skipping unreadable inbox entry"
                    );
                }
            }
        }

        Ok(envelopes)
    }

    fn accepts(&self, path: &Path) -> bool {
        let is_hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with('.'))
            .unwrap_or(true);
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase);

        !is_hidden
            && extension.map(|extension| self.extensions.contains(&extension)).unwrap_or(false)
    }
}

/// Builds an envelope from a file's raw bytes. Chat captures are recognised by their header;
/// everything else is a plain folder message.
pub fn envelope_from_file(path: &Path, bytes: Vec<u8>, modified: DateTime<Utc>) -> Envelope {
    let text = String::from_utf8_lossy(&bytes);
    if text.contains(CHAT_SOURCE_MARKER) {
        if let Some(capture) = parse_chat_capture(&text) {
            return Envelope {
                source: MessageSource::Chat,
                sender: capture.sender,
                body: MessageBody::from(capture.body),
                received_at: capture.timestamp.unwrap_or(modified),
                origin: Some(path.to_path_buf()),
            };
        }
    }

    let file_name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();
    Envelope {
        source: MessageSource::Folder,
        sender: extract_sender(file_name, &text),
        body: MessageBody::from_bytes(bytes),
        received_at: modified,
        origin: Some(path.to_path_buf()),
    }
}

/// `report_from_sarah_lee.txt` → `Sarah Lee`; otherwise a `From:` line near the top.
pub fn extract_sender(file_name: &str, content: &str) -> String {
    if let Some((_, rest)) = file_name.split_once("_from_") {
        let stem = Path::new(rest).file_stem().and_then(|stem| stem.to_str()).unwrap_or(rest);
        let name = title_case(&stem.replace('_', " "));
        if !name.is_empty() {
            return name;
        }
    }

    content
        .lines()
        .take(SENDER_LOOKAHEAD_LINES)
        .find_map(|line| {
            let trimmed = line.trim();
            let prefix = trimmed.get(..5)?;
            prefix.eq_ignore_ascii_case("from:").then(|| trimmed[5..].trim().to_string())
        })
        .filter(|sender| !sender.is_empty())
        .unwrap_or_else(|| UNKNOWN_SENDER.to_string())
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[derive(Debug, PartialEq, Eq)]
struct ChatCapture {
    sender: String,
    timestamp: Option<DateTime<Utc>>,
    body: String,
}

fn parse_chat_capture(text: &str) -> Option<ChatCapture> {
    let field = |name: &str| {
        let prefix = format!("**{name}**:");
        text.lines().find_map(|line| line.trim().strip_prefix(prefix.as_str()).map(str::trim))
    };

    let sender = field("Sender").filter(|sender| !sender.is_empty()).unwrap_or(UNKNOWN_SENDER);
    let timestamp = field("Timestamp").and_then(parse_capture_timestamp);

    let after_marker = text.split_once("**Message**:")?.1;
    let fenced = after_marker.split_once("```")?.1;
    let fenced =
        fenced.strip_prefix('\n').or_else(|| fenced.strip_prefix("\r\n")).unwrap_or(fenced);
    let body = match fenced.rsplit_once("```") {
        Some((body, _)) => body,
        None => fenced,
    };

    Some(ChatCapture {
        sender: sender.to_string(),
        timestamp,
        body: body.trim_end().to_string(),
    })
}

fn parse_capture_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok()?;
    Local.from_local_datetime(&naive).single().map(|local| local.with_timezone(&Utc))
}

/// Moves a resolved message's source out of the inbox.
pub trait MessageArchive: Send + Sync {
    /// Returns the new location, or `None` when the message has no source file.
    fn archive(&self, message: &Message) -> Result<Option<PathBuf>, ArchiveError>;
}

#[derive(Clone, Debug)]
pub struct FolderArchive {
    processed_dir: PathBuf,
}

impl FolderArchive {
    pub fn new(processed_dir: impl Into<PathBuf>) -> Self {
        Self { processed_dir: processed_dir.into() }
    }
}

impl MessageArchive for FolderArchive {
    fn archive(&self, message: &Message) -> Result<Option<PathBuf>, ArchiveError> {
        let Some(origin) = message.origin.as_ref() else {
            return Ok(None);
        };

        let file_name = origin
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.txt", message.id()));
        let mut destination = self.processed_dir.join(&file_name);
        if destination.exists() {
            destination = self.processed_dir.join(format!("{}-{file_name}", message.id()));
        }

        move_file(origin, &destination).map_err(|reason| ArchiveError::Move {
            from: origin.clone(),
            to: destination.clone(),
            reason,
        })?;
        Ok(Some(destination))
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), String> {
    if to.exists() {
        return Err("destination already exists".to_string());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // Rename fails across filesystems; fall back to copy and delete.
        Err(rename_error) => {
            fs::copy(from, to).map_err(|_| rename_error.to_string())?;
            fs::remove_file(from).map_err(|error| {
                let _ = fs::remove_file(to);
                error.to_string()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::{envelope_from_file, extract_sender, FolderArchive, FolderInbox, MessageArchive};
    use crate::domain::message::{Envelope, Message, MessageId, MessageSource};

    fn extensions() -> Vec<String> {
        vec!["txt".to_owned(), "md".to_owned()]
    }

    #[test]
    fn sender_comes_from_file_name_then_from_line() {
        assert_eq!(extract_sender("budget_from_sarah_lee.txt", ""), "Sarah Lee");
        assert_eq!(extract_sender("note.txt", "Subject: x\nFROM: Ops Desk\nbody"), "Ops Desk");
        assert_eq!(extract_sender("note.txt", "a\nb\nc\nd\ne\nFrom: too late"), "Unknown");
    }

    #[test]
    fn chat_capture_is_parsed() {
        let capture = "# WhatsApp Message\n\n**Source**: WhatsApp\n\n**Sender**: Mom\n\n\
                       **Timestamp**: 2026-03-01T10:00:00Z\n\n**Message**:\n```\nCall me tonight\nplease\n```\n";
        let path = Path::new("whatsapp_Mom_1.md");
        let envelope = envelope_from_file(path, capture.as_bytes().to_vec(), Utc::now());

        assert_eq!(envelope.source, MessageSource::Chat);
        assert_eq!(envelope.sender, "Mom");
        assert_eq!(envelope.body.text().ok(), Some("Call me tonight\nplease"));
        assert_eq!(envelope.received_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }

    #[test]
    fn plain_files_keep_raw_bytes() {
        let bytes = vec![0xff, 0xfe, b'h', b'i'];
        let envelope = envelope_from_file(Path::new("blob.txt"), bytes.clone(), Utc::now());
        assert_eq!(envelope.source, MessageSource::Folder);
        assert_eq!(envelope.body.as_bytes(), bytes.as_slice());
        assert!(envelope.body.text().is_err());
    }

    #[test]
    fn scan_filters_extensions_and_hands_each_file_out_once() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        fs::write(dir.path().join("a_from_bob.txt"), "hello").map_err(|err| err.to_string())?;
        fs::write(dir.path().join("image.png"), "binary").map_err(|err| err.to_string())?;
        fs::write(dir.path().join(".hidden.txt"), "x").map_err(|err| err.to_string())?;

        let mut inbox = FolderInbox::new(dir.path(), &extensions());
        let first = inbox.scan().map_err(|err| err.to_string())?;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sender, "Bob");

        assert!(inbox.scan().map_err(|err| err.to_string())?.is_empty());

        fs::write(dir.path().join("b.md"), "later").map_err(|err| err.to_string())?;
        assert_eq!(inbox.scan().map_err(|err| err.to_string())?.len(), 1);
        Ok(())
    }

    #[test]
    fn archived_names_are_picked_up_again() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let inbox_dir = dir.path().join("inbox");
        let processed_dir = dir.path().join("processed");
        fs::create_dir_all(&inbox_dir).map_err(|err| err.to_string())?;
        fs::create_dir_all(&processed_dir).map_err(|err| err.to_string())?;
        fs::write(inbox_dir.join("note.txt"), "first").map_err(|err| err.to_string())?;

        let mut inbox = FolderInbox::new(&inbox_dir, &extensions());
        let first = inbox.scan().map_err(|err| err.to_string())?;
        assert_eq!(first.len(), 1);

        let message = Message::from_envelope(first.into_iter().next().ok_or("no envelope")?);
        FolderArchive::new(&processed_dir).archive(&message).map_err(|err| err.to_string())?;

        fs::write(inbox_dir.join("note.txt"), "second").map_err(|err| err.to_string())?;
        let second = inbox.scan().map_err(|err| err.to_string())?;
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body.text().ok(), Some("second"));
        Ok(())
    }

    #[test]
    fn archive_moves_without_overwriting() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err| err.to_string())?;
        let inbox_dir = dir.path().join("inbox");
        let processed_dir = dir.path().join("processed");
        fs::create_dir_all(&inbox_dir).map_err(|err| err.to_string())?;
        fs::create_dir_all(&processed_dir).map_err(|err| err.to_string())?;

        let source = inbox_dir.join("note.txt");
        fs::write(&source, "new").map_err(|err| err.to_string())?;
        fs::write(processed_dir.join("note.txt"), "old").map_err(|err| err.to_string())?;

        let mut envelope = Envelope::typed("Bob", "new");
        envelope.origin = Some(source.clone());
        let message = Message::with_id(MessageId("msg-9".to_owned()), envelope);

        let archived = FolderArchive::new(&processed_dir)
            .archive(&message)
            .map_err(|err| err.to_string())?;
        assert_eq!(archived, Some(processed_dir.join("msg-9-note.txt")));
        assert!(!source.exists());
        assert_eq!(
            fs::read_to_string(processed_dir.join("note.txt")).map_err(|err| err.to_string())?,
            "old"
        );
        Ok(())
    }

    #[test]
    fn typed_messages_have_nothing_to_archive() -> Result<(), String> {
        let message = Message::from_envelope(Envelope::typed("Bob", "hi"));
        let archived =
            FolderArchive::new("/nonexistent").archive(&message).map_err(|err| err.to_string())?;
        assert_eq!(archived, None);
        Ok(())
    }

    #[test]
    fn missing_source_is_an_archive_error() {
        let mut envelope = Envelope::typed("Bob", "hi");
        envelope.origin = Some("/nonexistent/inbox/gone.txt".into());
        let message = Message::from_envelope(envelope);
        assert!(FolderArchive::new("/nonexistent/processed").archive(&message).is_err());
    }
}
