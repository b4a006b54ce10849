pub mod approval;
pub mod bootstrap;
pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use steward_core::config::{ApprovalMode, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "steward",
    about = "Message triage with human-approved actions",
    long_about = "Analyze incoming messages with a bounded tool-calling loop, ask for approval of each proposed reply draft or task, and keep an audit record per message.",
    after_help = "Examples:\n  steward doctor --json\n  steward process --approve observe\n  steward analyze \"Can you review the report by Friday?\" --sender Sarah\n  steward demo --offline"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a steward.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Use the built-in skill sweep instead of the model endpoint")]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

const APPROVE_HELP: &str = "interactive | auto_approve | observe";

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Process every message currently in the inbox, then exit")]
    Process {
        #[arg(long, value_parser = parse_approval_mode, help = APPROVE_HELP)]
        approve: Option<ApprovalMode>,
    },
    #[command(about = "Poll the inbox and process messages as they arrive until Ctrl-C")]
    Watch {
        #[arg(long, value_parser = parse_approval_mode, help = APPROVE_HELP)]
        approve: Option<ApprovalMode>,
    },
    #[command(about = "Run one typed message through the full pipeline")]
    Analyze {
        text: String,
        #[arg(long, default_value = "Unknown")]
        sender: String,
        #[arg(long, value_parser = parse_approval_mode, help = APPROVE_HELP)]
        approve: Option<ApprovalMode>,
    },
    #[command(about = "Analyze a built-in sample message and show the actions it would propose")]
    Demo,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, vault directories, model endpoint and approval surface")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn parse_approval_mode(value: &str) -> Result<ApprovalMode, String> {
    value.parse::<ApprovalMode>().map_err(|error| error.to_string())
}

impl Cli {
    fn load_options(&self, approval_mode: Option<ApprovalMode>) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides { approval_mode, ..ConfigOverrides::default() },
        }
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let offline = cli.offline;

    let result = match &cli.command {
        Command::Process { approve } => {
            commands::process::run(cli.load_options(*approve), offline).await
        }
        Command::Watch { approve } => {
            commands::watch::run(cli.load_options(*approve), offline).await
        }
        Command::Analyze { text, sender, approve } => {
            commands::analyze::run(cli.load_options(*approve), offline, text, sender).await
        }
        Command::Demo => commands::demo::run(cli.load_options(None), offline).await,
        Command::Config => commands::config::run(&cli.load_options(None)),
        Command::Doctor { json } => commands::doctor::run(&cli.load_options(None), *json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
