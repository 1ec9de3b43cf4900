// autoresolve-rs/src/config.rs
// Runtime configuration for the monitor and pipeline.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_millis(1_000);
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(2_000);
pub const DEFAULT_WORKFLOW_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_VERIFICATION_WINDOW: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Run the deep-analysis workflow on failures instead of only hinting.
    pub auto_fix_enabled: bool,
    pub data_dir: PathBuf,
    /// Append-only NDJSON log written by the shell hook.
    pub event_log_path: PathBuf,
    pub status_path: PathBuf,
    pub history_dir: PathBuf,
    pub learning_state_path: PathBuf,
    pub poll_interval: Duration,
    /// Pause after an unexpected error in the polling loop.
    pub error_backoff: Duration,
    /// How long `stop` waits for the polling task to finish.
    pub stop_timeout: Duration,
    pub workflow_timeout: Duration,
    /// How long a surfaced remedy waits for the command to be rerun.
    pub verification_window: Duration,
}

impl ResolverConfig {
    /// Defaults with every path placed under `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            auto_fix_enabled: true,
            event_log_path: data_dir.join("commands.log"),
            status_path: data_dir.join("monitor_status.json"),
            history_dir: data_dir.join("history"),
            learning_state_path: data_dir.join("learning.json"),
            data_dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            workflow_timeout: DEFAULT_WORKFLOW_TIMEOUT,
            verification_window: DEFAULT_VERIFICATION_WINDOW,
        }
    }

    /// Construct configuration from environment variables.
    ///
    /// Never panics: unparsable values are logged and replaced by defaults.
    /// - AUTORESOLVE_AUTO_FIX: "1", "true", "yes", "on" / "0", "false", "no", "off"
    /// - AUTORESOLVE_DATA_DIR, AUTORESOLVE_EVENT_LOG, AUTORESOLVE_LEARNING_PATH: paths
    /// - AUTORESOLVE_POLL_INTERVAL_MS, AUTORESOLVE_ERROR_BACKOFF_MS,
    ///   AUTORESOLVE_STOP_TIMEOUT_MS: milliseconds
    /// - AUTORESOLVE_WORKFLOW_TIMEOUT_SECS, AUTORESOLVE_VERIFY_WINDOW_SECS: seconds
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("AUTORESOLVE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| env::temp_dir().join("autoresolve"));
        let mut cfg = Self::for_data_dir(data_dir);

        if let Some(raw) = lookup("AUTORESOLVE_AUTO_FIX") {
            match parse_bool(&raw) {
                Some(value) => cfg.auto_fix_enabled = value,
                None => tracing::warn!(value = %raw, "invalid AUTORESOLVE_AUTO_FIX; using default"),
            }
        }
        if let Some(path) = lookup("AUTORESOLVE_EVENT_LOG") {
            cfg.event_log_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("AUTORESOLVE_LEARNING_PATH") {
            cfg.learning_state_path = PathBuf::from(path);
        }

        cfg.poll_interval = duration_var(&lookup, "AUTORESOLVE_POLL_INTERVAL_MS", Duration::from_millis, cfg.poll_interval);
        cfg.error_backoff = duration_var(&lookup, "AUTORESOLVE_ERROR_BACKOFF_MS", Duration::from_millis, cfg.error_backoff);
        cfg.stop_timeout = duration_var(&lookup, "AUTORESOLVE_STOP_TIMEOUT_MS", Duration::from_millis, cfg.stop_timeout);
        cfg.workflow_timeout = duration_var(&lookup, "AUTORESOLVE_WORKFLOW_TIMEOUT_SECS", Duration::from_secs, cfg.workflow_timeout);
        cfg.verification_window = duration_var(&lookup, "AUTORESOLVE_VERIFY_WINDOW_SECS", Duration::from_secs, cfg.verification_window);

        cfg
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::for_data_dir(env::temp_dir().join("autoresolve"))
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn duration_var<F>(lookup: &F, name: &str, unit: fn(u64) -> Duration, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => default,
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(value) if value > 0 => unit(value),
            _ => {
                tracing::warn!(var = name, value = %raw, "invalid duration; using default");
                default
            }
        },
    }
}
