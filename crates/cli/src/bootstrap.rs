use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use steward_agent::llm::{LlmClient, SkillSweep};
use steward_agent::openrouter::OpenAiCompatibleClient;
use steward_agent::runtime::MessageCoordinator;
use steward_core::approvals::{non_interactive_surface, ApprovalSurface};
use steward_core::config::{AppConfig, ApprovalMode, ConfigError, LlmConfig, LoadOptions};
use steward_core::errors::{ModelBackendError, ToolError};
use steward_core::vault::VaultLayout;
use thiserror::Error;
use tracing::info;

use crate::approval::ConsoleApproval;
use crate::logging::init_logging;

pub struct Application {
    pub config: AppConfig,
    pub layout: VaultLayout,
    pub coordinator: MessageCoordinator,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not prepare vault directory `{path}`: {source}")]
    Vault { path: PathBuf, source: io::Error },
    #[error("tool catalog is inconsistent: {0}")]
    Tools(#[from] ToolError),
    #[error("model client could not be created: {0}")]
    ModelClient(#[from] ModelBackendError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_validation",
            Self::Vault { .. } => "vault_bootstrap",
            Self::Tools(_) => "tool_registry",
            Self::ModelClient(_) => "model_client",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Vault { .. } | Self::Tools(_) | Self::ModelClient(_) => 3,
        }
    }
}

/// Loads configuration, starts logging, then wires the pipeline.
pub fn bootstrap(options: LoadOptions, offline: bool) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    init_logging(&config.logging);

    let client = model_client(&config.llm, offline)?;
    let surface = approval_surface(config.approval.mode);
    bootstrap_with_config(config, client, surface)
}

pub fn bootstrap_with_config(
    config: AppConfig,
    client: Arc<dyn LlmClient>,
    surface: Arc<dyn ApprovalSurface>,
) -> Result<Application, BootstrapError> {
    let layout = config.vault.layout();
    layout
        .ensure()
        .map_err(|source| BootstrapError::Vault { path: layout.root.clone(), source })?;

    let coordinator = MessageCoordinator::from_config(&config, client, surface)?;
    info!(
        event_name = "system.bootstrap.ready",
        vault = %layout.root.display(),
        provider = config.llm.provider.as_str(),
        approval_mode = config.approval.mode.as_str(),
        max_rounds = config.agent.max_rounds,
        "pipeline ready"
    );

    Ok(Application { config, layout, coordinator })
}

/// `SkillSweep` stands in for the network model when running offline.
pub fn model_client(
    llm: &LlmConfig,
    offline: bool,
) -> Result<Arc<dyn LlmClient>, BootstrapError> {
    if offline {
        return Ok(Arc::new(SkillSweep));
    }
    Ok(Arc::new(OpenAiCompatibleClient::from_config(llm)?))
}

pub fn approval_surface(mode: ApprovalMode) -> Arc<dyn ApprovalSurface> {
    non_interactive_surface(mode).unwrap_or_else(|| Arc::new(ConsoleApproval::stdio()))
}

#[cfg(test)]
mod tests {
    use steward_core::config::AppConfig;
    use steward_core::errors::ModelBackendError;

    use super::{model_client, BootstrapError};

    #[test]
    fn client_construction_failure_is_a_bootstrap_error() {
        let error = BootstrapError::from(ModelBackendError::Transport("no tls backend".into()));
        assert_eq!(error.error_class(), "model_client");
        assert_eq!(error.exit_code(), 3);
        assert!(error.to_string().contains("no tls backend"));
    }

    #[test]
    fn offline_and_online_clients_are_built_from_config() {
        let llm = AppConfig::default().llm;
        assert!(model_client(&llm, true).is_ok());
        assert!(model_client(&llm, false).is_ok());
    }
}
