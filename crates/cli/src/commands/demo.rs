use std::sync::Arc;

use serde::Serialize;
use steward_agent::brain::ReasoningLoop;
use steward_agent::tools::ToolRegistry;
use steward_core::config::{AppConfig, LoadOptions};
use steward_core::domain::action::{derive_actions, ActionRequest};
use steward_core::domain::analysis::AnalysisResult;
use steward_core::domain::message::MessageId;

use crate::bootstrap::model_client;
use crate::commands::CommandResult;
use crate::logging::init_logging;

pub const SAMPLE_SENDER: &str = "Sarah";

pub const SAMPLE_MESSAGE: &str = "Hi,

I need your help with the quarterly budget report. Can you please review the attached spreadsheet and send me your feedback by tomorrow 2 PM? This is urgent as we have a board meeting on Friday.

Also, please schedule a follow-up meeting with the finance team to discuss the Q3 projections.

Thanks,
Sarah (Finance Director)
";

#[derive(Debug, Serialize)]
struct ProposedActionView {
    sequence: u32,
    #[serde(flatten)]
    request: ActionRequest,
}

#[derive(Debug, Serialize)]
struct DemoReport {
    sender: &'static str,
    message: &'static str,
    rounds: u32,
    stop: &'static str,
    analysis: AnalysisResult,
    proposed_actions: Vec<ProposedActionView>,
}

/// Analyzes the built-in sample and lists the actions it would propose. Nothing is approved,
/// written or archived.
pub async fn run(options: LoadOptions, offline: bool) -> CommandResult {
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("demo", "config_validation", error.to_string(), 2)
        }
    };
    init_logging(&config.logging);

    let registry = match ToolRegistry::with_builtin_skills() {
        Ok(registry) => registry,
        Err(error) => {
            return CommandResult::failure("demo", error.error_class(), error.to_string(), 3)
        }
    };
    let client = match model_client(&config.llm, offline) {
        Ok(client) => client,
        Err(error) => {
            return CommandResult::failure("demo", error.error_class(), error.to_string(), 3)
        }
    };
    let reasoning = ReasoningLoop::from_config(client, Arc::new(registry), &config);

    let message_id = MessageId("demo".to_string());
    let outcome = reasoning.analyze(&message_id, SAMPLE_SENDER, SAMPLE_MESSAGE).await;
    let proposed_actions = derive_actions(&outcome.analysis)
        .iter()
        .map(|action| ProposedActionView { sequence: action.sequence, request: action.request() })
        .collect::<Vec<_>>();

    let message = format!(
        "sample analyzed in {} round(s); {} action(s) would be proposed for approval",
        outcome.rounds,
        proposed_actions.len()
    );
    let report = DemoReport {
        sender: SAMPLE_SENDER,
        message: SAMPLE_MESSAGE,
        rounds: outcome.rounds,
        stop: outcome.stop.as_str(),
        analysis: outcome.analysis,
        proposed_actions,
    };
    CommandResult::success_with("demo", message, Some(report))
}
