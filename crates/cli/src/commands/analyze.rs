use steward_core::config::LoadOptions;
use steward_core::domain::message::{Envelope, Message};

use crate::bootstrap::bootstrap;
use crate::commands::{BatchReport, CommandResult};

/// Runs a typed message through the full pipeline. There is no source file to archive.
pub async fn run(options: LoadOptions, offline: bool, text: &str, sender: &str) -> CommandResult {
    if text.trim().is_empty() {
        return CommandResult::failure("analyze", "invalid_input", "message text is empty", 2);
    }

    let app = match bootstrap(options, offline) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure(
                "analyze",
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            )
        }
    };

    let mut message = Message::from_envelope(Envelope::typed(sender, text));
    let result = app.coordinator.process(&mut message).await;

    let mut report = BatchReport::default();
    report.record(&message, result);
    report.into_result("analyze")
}
