use std::fs;
use std::io::IsTerminal;
use std::path::Path;

use serde::Serialize;
use steward_core::config::{AppConfig, ApprovalMode, LoadOptions};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const PROBE_FILE: &str = ".steward-doctor-probe";

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_vault(&config));
            checks.push(check_model_endpoint(&config));
            checks.push(check_approval_surface(config.approval.mode));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["vault_directories", "model_endpoint", "approval_surface"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_vault(config: &AppConfig) -> DoctorCheck {
    let layout = config.vault.layout();
    let result = layout.ensure().map_err(|error| error.to_string()).and_then(|()| {
        for (name, dir) in layout.directories() {
            probe_writable(dir).map_err(|error| format!("{name} `{}`: {error}", dir.display()))?;
        }
        Ok(())
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "vault_directories",
            status: CheckStatus::Pass,
            details: format!("vault at `{}` is writable", layout.root.display()),
        },
        Err(details) => {
            DoctorCheck { name: "vault_directories", status: CheckStatus::Fail, details }
        }
    }
}

fn probe_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(PROBE_FILE);
    fs::write(&probe, b"ok")?;
    fs::remove_file(&probe)
}

/// Configuration only: no request is sent to the endpoint.
fn check_model_endpoint(config: &AppConfig) -> DoctorCheck {
    let llm = &config.llm;
    if llm.provider.requires_api_key() && !llm.has_api_key() {
        return DoctorCheck {
            name: "model_endpoint",
            status: CheckStatus::Fail,
            details: format!("{} requires an API key", llm.provider.as_str()),
        };
    }

    DoctorCheck {
        name: "model_endpoint",
        status: CheckStatus::Pass,
        details: format!(
            "{} at `{}` with model `{}`",
            llm.provider.as_str(),
            llm.endpoint_base(),
            llm.model
        ),
    }
}

fn check_approval_surface(mode: ApprovalMode) -> DoctorCheck {
    if mode == ApprovalMode::Interactive && !std::io::stdin().is_terminal() {
        return DoctorCheck {
            name: "approval_surface",
            status: CheckStatus::Fail,
            details: "interactive approval needs a terminal on stdin; use `--approve auto_approve` or `--approve observe`".to_string(),
        };
    }

    DoctorCheck {
        name: "approval_surface",
        status: CheckStatus::Pass,
        details: format!("approval mode `{}`", mode.as_str()),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
