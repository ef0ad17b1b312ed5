use chatrelay_core::config::{is_bot_token_shaped, AppConfig, LoadOptions};
use chatrelay_telegram::BotApi;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
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

pub fn run(json_output: bool, online: bool) -> CommandResult {
    let report = build_report(online);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn build_report(online: bool) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bot_token(&config));
            checks.push(check_webhook(&config));
            checks.push(check_llm_endpoint(&config));
            checks.push(check_history_window(&config));
            checks.push(if online { check_bot_identity(&config) } else { offline_identity(&config) });
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in
                ["bot_token", "webhook", "llm_endpoint", "history_window", "bot_identity"]
            {
                checks.push(skipped(name));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if failed {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if warned {
        (CheckStatus::Warn, "doctor: ready with warnings")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_bot_token(config: &AppConfig) -> DoctorCheck {
    let shaped = is_bot_token_shaped(config.telegram.bot_token.expose_secret());
    DoctorCheck {
        name: "bot_token",
        status: if shaped { CheckStatus::Pass } else { CheckStatus::Fail },
        details: if shaped {
            "token has the `<bot id>:<secret>` shape issued by @BotFather".to_string()
        } else {
            "token does not look like a Bot API token".to_string()
        },
    }
}

fn check_webhook(config: &AppConfig) -> DoctorCheck {
    let telegram = &config.telegram;
    match (&telegram.webhook_url, &telegram.webhook_secret) {
        (None, _) => DoctorCheck {
            name: "webhook",
            status: CheckStatus::Warn,
            details: "telegram.webhook_url unset; setWebhook must be called out of band".to_string(),
        },
        (Some(url), None) => DoctorCheck {
            name: "webhook",
            status: CheckStatus::Warn,
            details: format!("{url} will accept unauthenticated calls; set telegram.webhook_secret"),
        },
        (Some(url), Some(_)) => DoctorCheck {
            name: "webhook",
            status: CheckStatus::Pass,
            details: format!("{url} registered with secret token at startup"),
        },
    }
}

fn check_llm_endpoint(config: &AppConfig) -> DoctorCheck {
    let base_url = &config.llm.base_url;
    if base_url.starts_with("https://") {
        DoctorCheck {
            name: "llm_endpoint",
            status: CheckStatus::Pass,
            details: format!("{base_url} with model {}", config.llm.model),
        }
    } else {
        DoctorCheck {
            name: "llm_endpoint",
            status: CheckStatus::Warn,
            details: format!("{base_url} is not TLS; the API key travels in clear text"),
        }
    }
}

fn check_history_window(config: &AppConfig) -> DoctorCheck {
    let conversation = &config.conversation;
    if conversation.upstream_window > conversation.max_history {
        DoctorCheck {
            name: "history_window",
            status: CheckStatus::Warn,
            details: format!(
                "upstream_window {} exceeds max_history {}; only {} turns can ever be sent",
                conversation.upstream_window, conversation.max_history, conversation.max_history
            ),
        }
    } else {
        DoctorCheck {
            name: "history_window",
            status: CheckStatus::Pass,
            details: format!(
                "storing {} turns, sending the last {}",
                conversation.max_history, conversation.upstream_window
            ),
        }
    }
}

fn offline_identity(config: &AppConfig) -> DoctorCheck {
    match &config.telegram.bot_username {
        Some(username) => DoctorCheck {
            name: "bot_identity",
            status: CheckStatus::Pass,
            details: format!("configured as @{}", username.trim_start_matches('@')),
        },
        None => DoctorCheck {
            name: "bot_identity",
            status: CheckStatus::Skipped,
            details: "resolved via getMe at startup; rerun with --online to verify".to_string(),
        },
    }
}

fn check_bot_identity(config: &AppConfig) -> DoctorCheck {
    let fail = |details: String| DoctorCheck { name: "bot_identity", status: CheckStatus::Fail, details };

    let api = match BotApi::new(&config.telegram) {
        Ok(api) => api,
        Err(error) => return fail(error.to_string()),
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => return fail(format!("failed to initialize async runtime: {error}")),
    };

    match runtime.block_on(api.get_me()) {
        Ok(identity) => match identity.username {
            Some(username) => DoctorCheck {
                name: "bot_identity",
                status: CheckStatus::Pass,
                details: format!("getMe answered @{username} (id {})", identity.id),
            },
            None => fail("getMe returned an account without a username".to_string()),
        },
        Err(error) => fail(format!("getMe failed: {error}")),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
