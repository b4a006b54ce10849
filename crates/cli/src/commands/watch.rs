//! Continuous mode. A producer task polls the inbox and queues envelopes; this task is the
//! single consumer and processes them one at a time. Ctrl-C is honoured between messages.

use std::time::Duration;

use steward_core::config::LoadOptions;
use steward_core::domain::message::{Envelope, Message};
use steward_core::inbox::FolderInbox;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bootstrap::bootstrap;
use crate::commands::{BatchReport, CommandResult};

const QUEUE_CAPACITY: usize = 64;

pub async fn run(options: LoadOptions, offline: bool) -> CommandResult {
    let app = match bootstrap(options, offline) {
        Ok(app) => app,
        Err(error) => {
            return CommandResult::failure(
                "watch",
                error.error_class(),
                error.to_string(),
                error.exit_code(),
            )
        }
    };

    let inbox = FolderInbox::new(&app.layout.inbox, &app.config.watcher.extensions);
    let interval = Duration::from_secs(app.config.watcher.poll_interval_secs);
    let (sender, mut receiver) = mpsc::channel(QUEUE_CAPACITY);
    let producer = tokio::spawn(poll_inbox(inbox, interval, sender));

    info!(
        event_name = "watch.started",
        inbox = %app.layout.inbox.display(),
        poll_interval_secs = interval.as_secs(),
        "watching inbox; press Ctrl-C to stop"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut report = BatchReport::default();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            next = receiver.recv() => {
                let Some(envelope) = next else { break };
                let mut message = Message::from_envelope(envelope);
                let result = app.coordinator.process(&mut message).await;
                report.record(&message, result);
            }
        }
    }

    producer.abort();
    info!(event_name = "watch.stopped", messages = report.len(), "watch stopped");
    report.into_result("watch")
}

async fn poll_inbox(mut inbox: FolderInbox, interval: Duration, sender: mpsc::Sender<Envelope>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match inbox.scan() {
            Ok(envelopes) => {
                for envelope in envelopes {
                    if sender.send(envelope).await.is_err() {
                        return;
                    }
                }
            }
            Err(error) => warn!(
                event_name = "inbox.scan_failed",
                inbox = %inbox.dir().display(),
                error = %error,
                "inbox scan failed; retrying on the next tick"
            ),
        }
    }
}
