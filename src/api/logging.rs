use super::error::DecodeError;
use crate::types::ChatRequest;
use crate::util::{env_nonempty, parse_bool_str};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_PATH: &str = "/tmp/medchat.log";
const DEFAULT_LOG_FILTER: &str = "medchat=info";
const LOG_FILTER_ENV: &str = "MEDCHAT_LOG";
const LOG_PATH_ENV: &str = "MEDCHAT_LOG_PATH";
const DEBUG_PAYLOAD_ENV: &str = "MEDCHAT_DEBUG_PAYLOAD";

/// Installs the global tracing subscriber.
///
/// When the terminal UI owns stderr, output goes to a log file instead.
pub fn init_logging(tui_active: bool) {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(path) = resolve_log_path(tui_active) {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let _ = builder
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .try_init();
                return;
            }
            // stderr is the TUI's screen.
            Err(_) if tui_active => return,
            Err(_) => {}
        }
    }

    let _ = builder
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(|v| parse_bool_str(&v))
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, request: &ChatRequest) {
    let payload = serde_json::to_string_pretty(request)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(url = request_url, %payload, "chat request payload");
}

pub fn emit_decode_error(generation: u64, error: &DecodeError) {
    tracing::warn!(
        generation,
        retries = error.retries,
        reason = %error.reason,
        line = %error.line,
        "dropped malformed stream line"
    );
}

fn resolve_log_path(tui_active: bool) -> Option<String> {
    env_nonempty(LOG_PATH_ENV).or_else(|| tui_active.then(|| DEFAULT_LOG_PATH.to_string()))
}
