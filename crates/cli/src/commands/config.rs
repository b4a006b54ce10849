use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use steward_core::config::{resolve_config_path, AppConfig, ConfigOverrides, LoadOptions};
use toml::Value;

use crate::commands::CommandResult;

struct SourceResolver<'a> {
    doc: Option<Value>,
    path: Option<PathBuf>,
    overrides: &'a ConfigOverrides,
}

impl SourceResolver<'_> {
    fn source(&self, key_path: &str, env_keys: &[&str], overridden: bool) -> String {
        if overridden {
            return "cli".to_string();
        }

        if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            )
        }
    };

    let path = resolve_config_path(options.config_path.as_deref());
    let resolver = SourceResolver {
        doc: load_config_file_doc(path.as_deref()),
        path,
        overrides: &options.overrides,
    };
    let overrides = resolver.overrides;

    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let layout = config.vault.layout();
    let extensions = config.watcher.extensions.join(",");

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_keys: &[&str], overridden: bool| {
        lines.push(render_line(key, value, resolver.source(key, env_keys, overridden)));
    };
    push(
        "llm.provider",
        config.llm.provider.as_str(),
        &["STEWARD_LLM_PROVIDER"],
        overrides.llm_provider.is_some(),
    );
    push("llm.model", &config.llm.model, &["STEWARD_LLM_MODEL"], overrides.llm_model.is_some());
    push(
        "llm.base_url",
        &config.llm.endpoint_base(),
        &["STEWARD_LLM_BASE_URL"],
        overrides.llm_base_url.is_some(),
    );
    push(
        "llm.api_key",
        &api_key,
        &["STEWARD_LLM_API_KEY", "OPENROUTER_API_KEY"],
        false,
    );
    push(
        "llm.temperature",
        &config.llm.temperature.to_string(),
        &["STEWARD_LLM_TEMPERATURE"],
        false,
    );
    push(
        "llm.max_tokens",
        &config.llm.max_tokens.to_string(),
        &["STEWARD_LLM_MAX_TOKENS"],
        false,
    );
    push(
        "llm.timeout_secs",
        &config.llm.timeout_secs.to_string(),
        &["STEWARD_LLM_TIMEOUT_SECS"],
        false,
    );
    push(
        "agent.max_rounds",
        &config.agent.max_rounds.to_string(),
        &["STEWARD_AGENT_MAX_ROUNDS"],
        overrides.max_rounds.is_some(),
    );
    push(
        "agent.fallback_priority",
        &config.agent.fallback_priority.to_string(),
        &["STEWARD_AGENT_FALLBACK_PRIORITY"],
        false,
    );
    push(
        "agent.fallback_category",
        &config.agent.fallback_category.to_string(),
        &["STEWARD_AGENT_FALLBACK_CATEGORY"],
        false,
    );
    push(
        "vault.root",
        &layout.root.display().to_string(),
        &["STEWARD_VAULT_ROOT"],
        overrides.vault_root.is_some(),
    );
    push(
        "vault.inbox",
        &layout.inbox.display().to_string(),
        &["STEWARD_VAULT_INBOX"],
        false,
    );
    push(
        "vault.processed",
        &layout.processed.display().to_string(),
        &["STEWARD_VAULT_PROCESSED"],
        false,
    );
    push(
        "vault.actions",
        &layout.actions.display().to_string(),
        &["STEWARD_VAULT_ACTIONS"],
        false,
    );
    push(
        "vault.logs",
        &layout.logs.display().to_string(),
        &["STEWARD_VAULT_LOGS"],
        false,
    );
    push(
        "approval.mode",
        config.approval.mode.as_str(),
        &["STEWARD_APPROVAL_MODE"],
        overrides.approval_mode.is_some(),
    );
    push(
        "watcher.poll_interval_secs",
        &config.watcher.poll_interval_secs.to_string(),
        &["STEWARD_WATCHER_POLL_INTERVAL_SECS"],
        false,
    );
    push(
        "watcher.extensions",
        &extensions,
        &["STEWARD_WATCHER_EXTENSIONS"],
        false,
    );
    push(
        "logging.level",
        &config.logging.level,
        &["STEWARD_LOGGING_LEVEL", "STEWARD_LOG_LEVEL"],
        overrides.log_level.is_some(),
    );
    push(
        "logging.format",
        &format!("{:?}", config.logging.format).to_lowercase(),
        &["STEWARD_LOGGING_FORMAT", "STEWARD_LOG_FORMAT"],
        false,
    );

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_keep_only_their_prefix() {
        assert_eq!(redact_token("sk-or-v1-abcdef"), "sk-***");
        assert_eq!(redact_token("plainsecret"), "<redacted>");
        assert_eq!(redact_token("  "), "<empty>");
    }

    #[test]
    fn dotted_paths_walk_nested_tables() {
        let doc = "[llm]\nmodel = \"x\"\n".parse::<toml::Value>().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.api_key"));
        assert!(!contains_path(&doc, "agent.max_rounds"));
    }
}
