// autoresolve-rs/src/monitor.rs
// Background polling loop over the command event log.
//
// Implementation notes:
// - One tokio task per running monitor; `start` is a no-op while it runs.
// - Shutdown is a broadcast signal checked between ticks; `stop` waits for
//   the task up to `stop_timeout` and aborts it after that.
// - Errors inside an iteration, including a panic while processing an
//   event, are logged, followed by `error_backoff`.
// - The read offset is committed per processed event and survives
//   stop/start. A restart does not replay handled events, and events left
//   unhandled by a shutdown or an aborted task are read again.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

use crate::bus::EventBus;
use crate::config::ResolverConfig;
use crate::events::EventLogReader;
use crate::history::CommandRecord;
use crate::model::CommandEvent;
use crate::pipeline::CommandPipeline;

/// How many commands `status` lists.
const RECENT_COMMANDS: usize = 10;

/// Contents of the status file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorState {
    pub is_monitoring: bool,
    pub auto_fix_enabled: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    #[serde(flatten)]
    pub state: MonitorState,
    pub recent_commands: Vec<CommandRecord>,
}

pub struct CommandMonitor {
    config: ResolverConfig,
    pipeline: Arc<CommandPipeline>,
    bus: EventBus,
    reader: Arc<tokio::sync::Mutex<EventLogReader>>,
    shutdown_tx: broadcast::Sender<()>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl CommandMonitor {
    pub fn new(config: ResolverConfig, pipeline: CommandPipeline) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let reader = EventLogReader::new(config.event_log_path.clone());
        Self {
            config,
            pipeline: Arc::new(pipeline),
            bus: EventBus::new(),
            reader: Arc::new(tokio::sync::Mutex::new(reader)),
            shutdown_tx,
            worker_handle: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &Arc<CommandPipeline> {
        &self.pipeline
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Register an observer that sees every event before the pipeline does.
    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&CommandEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.register_handler(handler);
    }

    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the polling task. Returns `false` if it was already running.
    pub async fn start(&self) -> bool {
        {
            let mut worker = self.lock_worker();
            if worker.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
                tracing::debug!("monitor already running");
                return false;
            }

            let handle = tokio::spawn(poll_loop(
                self.reader.clone(),
                self.bus.clone(),
                self.pipeline.clone(),
                self.shutdown_tx.subscribe(),
                self.config.clone(),
            ));
            *worker = Some(handle);
        }

        tracing::info!(
            event_log = %self.config.event_log_path.display(),
            auto_fix = self.pipeline.auto_fix_enabled(),
            "command monitor started"
        );
        self.write_state(true).await;
        true
    }

    /// Signal the polling task and wait for it, bounded by `stop_timeout`.
    pub async fn stop(&self) {
        let handle = self.lock_worker().take();
        let Some(mut handle) = handle else {
            self.write_state(false).await;
            return;
        };

        let _ = self.shutdown_tx.send(());

        match timeout(self.config.stop_timeout, &mut handle).await {
            Ok(Ok(())) => tracing::info!("command monitor stopped"),
            Ok(Err(err)) => tracing::error!(error = %err, "monitor task ended abnormally"),
            Err(_) => {
                tracing::warn!(
                    timeout = ?self.config.stop_timeout,
                    "monitor task did not stop in time; aborting"
                );
                handle.abort();
            }
        }

        self.write_state(false).await;
    }

    /// Switch between deep analysis and hint-only mode and persist it.
    pub async fn set_auto_fix(&self, enabled: bool) {
        self.pipeline.set_auto_fix(enabled);
        tracing::info!(auto_fix = enabled, "auto-fix mode changed");
        self.write_state(self.is_running()).await;
    }

    /// Apply the auto-fix mode saved by an earlier run, if a status file exists.
    pub async fn restore_auto_fix(&self) -> Option<bool> {
        let state = load_state(&self.config.status_path).await?;
        self.pipeline.set_auto_fix(state.auto_fix_enabled);
        tracing::info!(auto_fix = state.auto_fix_enabled, "restored auto-fix mode");
        Some(state.auto_fix_enabled)
    }

    pub async fn status(&self) -> MonitorStatus {
        let recent_commands = match self.pipeline.history().recent_commands(RECENT_COMMANDS).await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read recent commands");
                Vec::new()
            }
        };

        MonitorStatus {
            state: self.current_state(self.is_running()),
            recent_commands,
        }
    }

    fn current_state(&self, is_monitoring: bool) -> MonitorState {
        MonitorState {
            is_monitoring,
            auto_fix_enabled: self.pipeline.auto_fix_enabled(),
            timestamp: Utc::now(),
        }
    }

    async fn write_state(&self, is_monitoring: bool) {
        let state = self.current_state(is_monitoring);
        let path = &self.config.status_path;

        let result = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let json = serde_json::to_vec(&state)?;
            tokio::fs::write(path, json).await?;
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "failed to write monitor status");
        }
    }

    fn lock_worker(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker_handle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Read any saved status file. Missing or unreadable files yield `None`.
pub async fn load_state(path: &std::path::Path) -> Option<MonitorState> {
    let buf = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&buf) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable monitor status");
            None
        }
    }
}

async fn poll_loop(
    reader: Arc<tokio::sync::Mutex<EventLogReader>>,
    bus: EventBus,
    pipeline: Arc<CommandPipeline>,
    mut shutdown_rx: broadcast::Receiver<()>,
    config: ResolverConfig,
) {
    let mut ticker = interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::debug!("monitor loop received shutdown");
                break;
            }
            _ = ticker.tick() => {
                match poll_once(&reader, &bus, &pipeline, &mut shutdown_rx).await {
                    Ok(Pass::Drained) => {}
                    Ok(Pass::Shutdown) => {
                        tracing::debug!("monitor loop received shutdown mid-batch");
                        break;
                    }
                    Err(err) => {
                        metrics::increment_counter!("autoresolve_monitor_errors_total");
                        tracing::error!(error = %err, backoff = ?config.error_backoff, "monitor iteration failed");
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            _ = sleep(config.error_backoff) => {}
                        }
                    }
                }
            }
        }
    }
}

enum Pass {
    Drained,
    Shutdown,
}

/// Process everything new in the log, committing the offset after each
/// event. A panicking event is committed and skipped; the rest of the
/// batch is picked up on the next tick.
async fn poll_once(
    reader: &tokio::sync::Mutex<EventLogReader>,
    bus: &EventBus,
    pipeline: &CommandPipeline,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> anyhow::Result<Pass> {
    let batch = reader.lock().await.peek_new_events().await?;

    for logged in &batch.events {
        if !matches!(shutdown_rx.try_recv(), Err(TryRecvError::Empty)) {
            return Ok(Pass::Shutdown);
        }

        bus.emit(&logged.event);
        let processed = AssertUnwindSafe(pipeline.process(&logged.event))
            .catch_unwind()
            .await;
        reader.lock().await.commit(logged.end_offset);

        if let Err(payload) = processed {
            metrics::increment_counter!("autoresolve_pipeline_panics_total");
            anyhow::bail!(
                "pipeline panicked on `{}`: {}",
                logged.event.command,
                panic_message(payload.as_ref())
            );
        }
    }

    reader.lock().await.commit(batch.end_offset);
    Ok(Pass::Drained)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
