use steward_core::config::LoadOptions;
use steward_core::domain::message::Message;
use steward_core::inbox::FolderInbox;
use tracing::info;

use crate::bootstrap::bootstrap;
use crate::commands::{BatchReport, CommandResult, EXIT_MESSAGE_FAILED};

/// One pass over the inbox: every file present now is processed in arrival order.
pub async fn run(options: LoadOptions, offline: bool) -> CommandResult {
    let app = match bootstrap(options, offline) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure(
                "process",
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            )
        }
    };

    let mut inbox = FolderInbox::new(&app.layout.inbox, &app.config.watcher.extensions);
    let envelopes = match inbox.scan() {
        Ok(envelopes) => envelopes,
        Err(error) => {
            return CommandResult::failure(
                "process",
                "acquisition",
                error.to_string(),
                EXIT_MESSAGE_FAILED,
            )
        }
    };

    info!(
        event_name = "inbox.scan_completed",
        inbox = %inbox.dir().display(),
        messages = envelopes.len(),
        "inbox scanned"
    );

    let mut report = BatchReport::default();
    for envelope in envelopes {
        let mut message = Message::from_envelope(envelope);
        let result = app.coordinator.process(&mut message).await;
        report.record(&message, result);
    }

    report.into_result("process")
}
