// autoresolve-rs/src/main.rs
// Autoresolve daemon - watches the command log until Ctrl-C

use std::env;
use std::sync::{Arc, RwLock};

use anyhow::Context;

use autoresolve::collaborators::{TracingReporter, UnconfiguredWorkflow};
use autoresolve::executor::DryRunExecutor;
use autoresolve::history::FileCommandHistory;
use autoresolve::logging::{init_logging, LoggingConfig};
use autoresolve::{CommandMonitor, CommandPipeline, Resolver, ResolverConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    init_logging(Some(LoggingConfig::from_env()))?;

    let config = ResolverConfig::from_env();

    let resolver = match Resolver::load(&config.learning_state_path) {
        Ok(resolver) => resolver,
        Err(err) => {
            tracing::warn!(
                path = %config.learning_state_path.display(),
                error = %err,
                "could not load learning state; starting fresh"
            );
            Resolver::new()
        }
    };
    let resolver = Arc::new(RwLock::new(resolver));

    let history = FileCommandHistory::new(&config.history_dir)
        .with_context(|| format!("creating history dir {}", config.history_dir.display()))?;

    let pipeline = CommandPipeline::new(resolver.clone(), Arc::new(history))
        .with_config(&config)
        .with_workflow(Arc::new(UnconfiguredWorkflow))
        .with_executor(Arc::new(DryRunExecutor::new()))
        .with_reporter(Arc::new(TracingReporter));

    let monitor = CommandMonitor::new(config.clone(), pipeline);

    // An explicit AUTORESOLVE_AUTO_FIX wins over the mode saved last run.
    if env::var_os("AUTORESOLVE_AUTO_FIX").is_none() {
        monitor.restore_auto_fix().await;
    }

    monitor.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;

    monitor.stop().await;

    let saved = match resolver.read() {
        Ok(resolver) => resolver.save(&config.learning_state_path),
        Err(_) => {
            tracing::error!("resolver lock poisoned; learning state not saved");
            Ok(())
        }
    };
    saved.with_context(|| format!("saving {}", config.learning_state_path.display()))?;

    Ok(())
}
