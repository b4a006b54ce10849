use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    steward_cli::run().await
}
