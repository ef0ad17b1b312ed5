use std::env;
use std::sync::{Mutex, OnceLock};

use chatrelay_cli::commands::{config, doctor, start};
use serde_json::Value;

const VALID_ENV: &[(&str, &str)] = &[
    ("CHATRELAY_TELEGRAM_BOT_TOKEN", "123456:super-secret-token"),
    ("CHATRELAY_TELEGRAM_BOT_USERNAME", "relaybot"),
    ("CHATRELAY_LLM_API_KEY", "sk-very-secret"),
];

#[test]
fn start_returns_success_with_valid_env() {
    with_env(VALID_ENV, || {
        let result = start::run();
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        let notes = payload["notes"].as_array().expect("notes array");
        assert!(notes.iter().any(|note| note == "bot handle configured as @relaybot"));
    });
}

#[test]
fn start_returns_config_failure_without_tokens() {
    with_env(&[], || {
        let result = start::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn config_output_is_redacted_and_attributed() {
    with_env(VALID_ENV, || {
        let output = config::run();

        assert!(!output.contains("super-secret-token"));
        assert!(!output.contains("sk-very-secret"));
        assert!(output.contains(
            "- telegram.bot_token = 123456:*** (source: env (CHATRELAY_TELEGRAM_BOT_TOKEN))"
        ));
        assert!(output.contains("- llm.api_key = <redacted> (source: env (CHATRELAY_LLM_API_KEY))"));
        assert!(output.contains("- rate_limit.max_requests = 3 (source: default)"));
    });
}

#[test]
fn port_alias_is_attributed() {
    let mut vars = VALID_ENV.to_vec();
    vars.push(("PORT", "8080"));
    with_env(&vars, || {
        let output = config::run();
        assert!(output.contains("- server.port = 8080 (source: env (PORT))"));
    });
}

#[test]
fn doctor_json_reports_warnings_without_webhook() {
    with_env(VALID_ENV, || {
        let result = doctor::run(true, false);
        assert_eq!(result.exit_code, 0);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "warn");
        let checks = report["checks"].as_array().expect("checks array");
        let webhook = checks.iter().find(|check| check["name"] == "webhook").expect("webhook check");
        assert_eq!(webhook["status"], "warn");
        let identity =
            checks.iter().find(|check| check["name"] == "bot_identity").expect("identity check");
        assert_eq!(identity["status"], "pass");
    });
}

#[test]
fn doctor_passes_with_authenticated_webhook() {
    let mut vars = VALID_ENV.to_vec();
    vars.push(("CHATRELAY_TELEGRAM_WEBHOOK_URL", "https://relay.example.com/webhook"));
    vars.push(("CHATRELAY_TELEGRAM_WEBHOOK_SECRET", "hook_secret-1"));
    with_env(&vars, || {
        let result = doctor::run(true, false);
        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(result.exit_code, 0);
    });
}

#[test]
fn doctor_fails_and_skips_when_config_invalid() {
    with_env(&[], || {
        let result = doctor::run(false, false);
        assert_eq!(result.exit_code, 1);
        assert!(result.output.starts_with("doctor: one or more readiness checks failed"));
        assert!(result.output.contains("- [skip] bot_token:"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CHATRELAY_TELEGRAM_BOT_TOKEN",
        "CHATRELAY_TELEGRAM_BOT_USERNAME",
        "CHATRELAY_TELEGRAM_API_BASE_URL",
        "CHATRELAY_TELEGRAM_WEBHOOK_URL",
        "CHATRELAY_TELEGRAM_WEBHOOK_PATH",
        "CHATRELAY_TELEGRAM_WEBHOOK_SECRET",
        "CHATRELAY_LLM_API_KEY",
        "CHATRELAY_LLM_BASE_URL",
        "CHATRELAY_LLM_MODEL",
        "CHATRELAY_LLM_TEMPERATURE",
        "CHATRELAY_LLM_MAX_TOKENS",
        "CHATRELAY_LLM_TIMEOUT_SECS",
        "CHATRELAY_CONVERSATION_MAX_HISTORY",
        "CHATRELAY_CONVERSATION_UPSTREAM_WINDOW",
        "CHATRELAY_RATE_LIMIT_MAX_REQUESTS",
        "CHATRELAY_RATE_LIMIT_WINDOW_SECS",
        "CHATRELAY_SERVER_BIND_ADDRESS",
        "CHATRELAY_SERVER_PORT",
        "PORT",
        "CHATRELAY_LOGGING_LEVEL",
        "CHATRELAY_LOGGING_FORMAT",
        "CHATRELAY_LOG_LEVEL",
        "CHATRELAY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
