use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::analysis::{AnalysisDefaults, Category, Priority};
use crate::vault::VaultLayout;

pub const DEFAULT_CONFIG_FILE: &str = "steward.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub vault: VaultConfig,
    pub approval: ApprovalConfig,
    pub watcher: WatcherConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_rounds: u32,
    pub fallback_priority: Priority,
    pub fallback_category: Category,
}

#[derive(Clone, Debug)]
pub struct VaultConfig {
    pub root: PathBuf,
    pub inbox: Option<PathBuf>,
    pub processed: Option<PathBuf>,
    pub actions: Option<PathBuf>,
    pub logs: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ApprovalConfig {
    pub mode: ApprovalMode,
}

#[derive(Clone, Debug)]
pub struct WatcherConfig {
    pub poll_interval_secs: u64,
    pub extensions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434/v1",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenRouter | Self::OpenAi)
    }
}

/// How proposed actions get their approve/reject decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    Interactive,
    AutoApprove,
    /// Observation only: every action is rejected and recorded as skipped.
    Observe,
}

impl ApprovalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::AutoApprove => "auto_approve",
            Self::Observe => "observe",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_base_url: Option<String>,
    pub max_rounds: Option<u32>,
    pub vault_root: Option<PathBuf>,
    pub approval_mode: Option<ApprovalMode>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                provider: LlmProvider::OpenRouter,
                api_key: None,
                base_url: None,
                model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
                temperature: 0.7,
                max_tokens: 2000,
                timeout_secs: 60,
            },
            agent: AgentConfig {
                max_rounds: 4,
                fallback_priority: Priority::Medium,
                fallback_category: Category::Other,
            },
            vault: VaultConfig {
                root: PathBuf::from("vault"),
                inbox: None,
                processed: None,
                actions: None,
                logs: None,
            },
            approval: ApprovalConfig { mode: ApprovalMode::Interactive },
            watcher: WatcherConfig {
                poll_interval_secs: 2,
                extensions: vec!["txt".to_string(), "md".to_string()],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Ok(Self::OpenRouter),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openrouter|openai|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for ApprovalMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "interactive" => Ok(Self::Interactive),
            "auto_approve" | "auto" => Ok(Self::AutoApprove),
            "observe" | "bronze" => Ok(Self::Observe),
            other => Err(ConfigError::Validation(format!(
                "unsupported approval mode `{other}` (expected interactive|auto_approve|observe)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl LlmConfig {
    /// Configured base URL, or the provider's public endpoint.
    pub fn endpoint_base(&self) -> String {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false)
    }
}

impl AgentConfig {
    pub fn analysis_defaults(&self) -> AnalysisDefaults {
        AnalysisDefaults { priority: self.fallback_priority, category: self.fallback_category }
    }
}

impl VaultConfig {
    pub fn layout(&self) -> VaultLayout {
        let under_root = |explicit: &Option<PathBuf>, name: &str| {
            explicit.clone().unwrap_or_else(|| self.root.join(name))
        };
        VaultLayout {
            root: self.root.clone(),
            inbox: under_root(&self.inbox, "inbox"),
            processed: under_root(&self.processed, "processed"),
            actions: under_root(&self.actions, "actions"),
            logs: under_root(&self.logs, "logs"),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(max_tokens) = llm.max_tokens {
                self.llm.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_rounds) = agent.max_rounds {
                self.agent.max_rounds = max_rounds;
            }
            if let Some(priority) = agent.fallback_priority {
                self.agent.fallback_priority =
                    parse_priority("agent.fallback_priority", &priority)?;
            }
            if let Some(category) = agent.fallback_category {
                self.agent.fallback_category =
                    parse_category("agent.fallback_category", &category)?;
            }
        }

        if let Some(vault) = patch.vault {
            if let Some(root) = vault.root {
                self.vault.root = root;
            }
            if let Some(inbox) = vault.inbox {
                self.vault.inbox = Some(inbox);
            }
            if let Some(processed) = vault.processed {
                self.vault.processed = Some(processed);
            }
            if let Some(actions) = vault.actions {
                self.vault.actions = Some(actions);
            }
            if let Some(logs) = vault.logs {
                self.vault.logs = Some(logs);
            }
        }

        if let Some(approval) = patch.approval {
            if let Some(mode) = approval.mode {
                self.approval.mode = mode;
            }
        }

        if let Some(watcher) = patch.watcher {
            if let Some(poll_interval_secs) = watcher.poll_interval_secs {
                self.watcher.poll_interval_secs = poll_interval_secs;
            }
            if let Some(extensions) = watcher.extensions {
                self.watcher.extensions = normalize_extensions(extensions);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STEWARD_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        let api_key = read_env("STEWARD_LLM_API_KEY").or_else(|| read_env("OPENROUTER_API_KEY"));
        if let Some(value) = api_key {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("STEWARD_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("STEWARD_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("STEWARD_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("STEWARD_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("STEWARD_LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_u32("STEWARD_LLM_MAX_TOKENS", &value)?;
        }
        if let Some(value) = read_env("STEWARD_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("STEWARD_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("STEWARD_AGENT_MAX_ROUNDS") {
            self.agent.max_rounds = parse_u32("STEWARD_AGENT_MAX_ROUNDS", &value)?;
        }
        if let Some(value) = read_env("STEWARD_AGENT_FALLBACK_PRIORITY") {
            self.agent.fallback_priority =
                parse_priority("STEWARD_AGENT_FALLBACK_PRIORITY", &value)?;
        }
        if let Some(value) = read_env("STEWARD_AGENT_FALLBACK_CATEGORY") {
            self.agent.fallback_category =
                parse_category("STEWARD_AGENT_FALLBACK_CATEGORY", &value)?;
        }

        if let Some(value) = read_env("STEWARD_VAULT_ROOT") {
            self.vault.root = PathBuf::from(value);
        }
        if let Some(value) = read_env("STEWARD_VAULT_INBOX") {
            self.vault.inbox = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("STEWARD_VAULT_PROCESSED") {
            self.vault.processed = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("STEWARD_VAULT_ACTIONS") {
            self.vault.actions = Some(PathBuf::from(value));
        }
        if let Some(value) = read_env("STEWARD_VAULT_LOGS") {
            self.vault.logs = Some(PathBuf::from(value));
        }

        if let Some(value) = read_env("STEWARD_APPROVAL_MODE") {
            self.approval.mode = value.parse()?;
        }

        if let Some(value) = read_env("STEWARD_WATCHER_POLL_INTERVAL_SECS") {
            self.watcher.poll_interval_secs =
                parse_u64("STEWARD_WATCHER_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("STEWARD_WATCHER_EXTENSIONS") {
            self.watcher.extensions =
                normalize_extensions(value.split(',').map(str::to_string).collect());
        }

        let log_level =
            read_env("STEWARD_LOGGING_LEVEL").or_else(|| read_env("STEWARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("STEWARD_LOGGING_FORMAT").or_else(|| read_env("STEWARD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_base_url) = overrides.llm_base_url {
            self.llm.base_url = Some(llm_base_url);
        }
        if let Some(max_rounds) = overrides.max_rounds {
            self.agent.max_rounds = max_rounds;
        }
        if let Some(vault_root) = overrides.vault_root {
            self.vault.root = vault_root;
        }
        if let Some(approval_mode) = overrides.approval_mode {
            self.approval.mode = approval_mode;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_agent(&self.agent)?;
        validate_vault(&self.vault)?;
        validate_watcher(&self.watcher)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `load` would read: an explicit path if it exists, else the first default location
/// found.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm.max_tokens must be greater than zero".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.provider.requires_api_key() && !llm.has_api_key() {
        return Err(ConfigError::Validation(format!(
            "llm.api_key is required for the {} provider. Set STEWARD_LLM_API_KEY or OPENROUTER_API_KEY, or switch llm.provider to ollama",
            llm.provider.as_str()
        )));
    }

    let base = llm.endpoint_base();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "llm.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_rounds == 0 || agent.max_rounds > 16 {
        return Err(ConfigError::Validation("agent.max_rounds must be in range 1..=16".to_string()));
    }
    Ok(())
}

fn validate_vault(vault: &VaultConfig) -> Result<(), ConfigError> {
    if vault.root.as_os_str().is_empty() {
        return Err(ConfigError::Validation("vault.root must not be empty".to_string()));
    }

    let layout = vault.layout();
    if layout.inbox == layout.processed {
        return Err(ConfigError::Validation(
            "vault.inbox and vault.processed must be different directories".to_string(),
        ));
    }
    Ok(())
}

fn validate_watcher(watcher: &WatcherConfig) -> Result<(), ConfigError> {
    if watcher.poll_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "watcher.poll_interval_secs must be greater than zero".to_string(),
        ));
    }
    if watcher.extensions.is_empty() {
        return Err(ConfigError::Validation(
            "watcher.extensions must list at least one file extension".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|extension| extension.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|extension| !extension.is_empty())
        .collect()
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse::<u32>().map_err(|_| invalid(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| invalid(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid(key, value))
}

fn parse_priority(key: &str, value: &str) -> Result<Priority, ConfigError> {
    Priority::parse(value).ok_or_else(|| invalid(key, value))
}

fn parse_category(key: &str, value: &str) -> Result<Category, ConfigError> {
    Category::parse(value).ok_or_else(|| invalid(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    agent: Option<AgentPatch>,
    vault: Option<VaultPatch>,
    approval: Option<ApprovalPatch>,
    watcher: Option<WatcherPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_rounds: Option<u32>,
    fallback_priority: Option<String>,
    fallback_category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VaultPatch {
    root: Option<PathBuf>,
    inbox: Option<PathBuf>,
    processed: Option<PathBuf>,
    actions: Option<PathBuf>,
    logs: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalPatch {
    mode: Option<ApprovalMode>,
}

#[derive(Debug, Default, Deserialize)]
struct WatcherPatch {
    poll_interval_secs: Option<u64>,
    extensions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
