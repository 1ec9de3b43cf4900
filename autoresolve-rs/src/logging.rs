// autoresolve-rs/src/logging.rs
// Global tracing subscriber setup.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::parse_bool;
use crate::error::Result;

static LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub json_format: bool,
    /// Daily-rolling file output in addition to stderr.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            log_dir: None,
        }
    }
}

impl LoggingConfig {
    /// AUTORESOLVE_LOG_LEVEL, AUTORESOLVE_LOG_JSON, AUTORESOLVE_LOG_DIR.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(level) = env::var("AUTORESOLVE_LOG_LEVEL") {
            if !level.trim().is_empty() {
                cfg.level = level.trim().to_ascii_lowercase();
            }
        }
        if let Some(json) = env::var("AUTORESOLVE_LOG_JSON").ok().and_then(|v| parse_bool(&v)) {
            cfg.json_format = json;
        }
        cfg.log_dir = env::var("AUTORESOLVE_LOG_DIR")
            .ok()
            .filter(|dir| !dir.trim().is_empty());
        cfg
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize logging: {0}")]
pub struct LoggingError(String);

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<()> {
    if LOGGING_INITIALIZED.load(Ordering::SeqCst) {
        return Ok(());
    }

    let config = config.unwrap_or_default();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,autoresolve={}", config.level)));

    let file_layer = config.log_dir.as_ref().map(|log_dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, "autoresolve.log");
        let (writer, guard) = NonBlocking::new(appender);
        // The guard flushes on drop; it has to live as long as the process.
        Box::leak(Box::new(guard));
        fmt::layer().with_writer(writer).with_ansi(false)
    });

    let subscriber = Registry::default().with(filter).with(file_layer);

    let result = if config.json_format {
        let json_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(subscriber.with(json_layer))
    } else {
        let text_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing::subscriber::set_global_default(subscriber.with(text_layer))
    };
    result.map_err(|e| LoggingError(e.to_string()))?;

    LOGGING_INITIALIZED.store(true, Ordering::SeqCst);

    tracing::info!(
        level = %config.level,
        json = config.json_format,
        log_dir = ?config.log_dir,
        "logging initialized"
    );

    Ok(())
}
