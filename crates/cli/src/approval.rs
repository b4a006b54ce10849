//! Interactive approval at the terminal.

use async_trait::async_trait;
use steward_core::approvals::{ApprovalPrompt, ApprovalSurface};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Shows each action and reads a `[Y/n]` answer. Empty input, `y` and `yes` approve; anything
/// else rejects, and so does a closed input stream.
pub struct ConsoleApproval<R, W> {
    io: Mutex<(BufReader<R>, W)>,
}

impl ConsoleApproval<Stdin, Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> ConsoleApproval<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { io: Mutex::new((BufReader::new(reader), writer)) }
    }

    pub fn into_writer(self) -> W {
        self.io.into_inner().1
    }
}

pub fn render_prompt(prompt: &ApprovalPrompt) -> String {
    let payload =
        prompt.payload().lines().map(|line| format!("    {line}")).collect::<Vec<_>>().join("\n");
    format!(
        "\n[ACTION {}/{}] {}\n{payload}\nApprove this action? [Y/n] ",
        prompt.sequence,
        prompt.total,
        prompt.kind().as_str()
    )
}

pub fn parse_answer(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

#[async_trait]
impl<R, W> ApprovalSurface for ConsoleApproval<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request_decision(&self, prompt: &ApprovalPrompt) -> bool {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        let shown = async {
            writer.write_all(render_prompt(prompt).as_bytes()).await?;
            writer.flush().await
        };
        if let Err(error) = shown.await {
            warn!(
                event_name = "approval.console_unavailable",
                sequence = prompt.sequence,
                error = %error,
                "could not show approval prompt; rejecting"
            );
            return false;
        }

        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => false,
            Ok(_) => parse_answer(&line),
            Err(error) => {
                warn!(
                    event_name = "approval.console_unavailable",
                    sequence = prompt.sequence,
                    error = %error,
                    "could not read approval answer; rejecting"
                );
                false
            }
        }
    }
}
