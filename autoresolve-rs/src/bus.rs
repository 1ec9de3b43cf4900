// autoresolve-rs/src/bus.rs
// Observer registry for command events.
//
// Delivery is best-effort and isolated: a handler that returns an error or
// panics is logged and skipped, and the remaining handlers still run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::model::CommandEvent;

pub type EventHandler = Arc<dyn Fn(&CommandEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default, Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&self, handler: F)
    where
        F: Fn(&CommandEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.push(Arc::new(handler));
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Deliver `event` to every handler. Returns how many handlers failed.
    pub fn emit(&self, event: &CommandEvent) -> usize {
        // Snapshot so handlers may register further handlers without deadlock.
        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut failures = 0;
        for (index, handler) in handlers.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    metrics::increment_counter!("autoresolve_handler_failures_total");
                    tracing::warn!(
                        handler = index,
                        command = %event.command,
                        error = %err,
                        "event handler failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    metrics::increment_counter!("autoresolve_handler_failures_total");
                    tracing::error!(
                        handler = index,
                        command = %event.command,
                        "event handler panicked"
                    );
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn failing_handler_does_not_block_others() {
        let bus = EventBus::new();
        let received = Arc::new(AtomicUsize::new(0));

        bus.register_handler(|_event| anyhow::bail!("observer is broken"));
        let counter = received.clone();
        bus.register_handler(move |event| {
            assert_eq!(event.command, "npm start");
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let failures = bus.emit(&CommandEvent::new("npm start", 127, "", "npm: command not found", 0.0));
        assert_eq!(failures, 1);
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let received = Arc::new(AtomicUsize::new(0));

        bus.register_handler(|_event| panic!("observer exploded"));
        let counter = received.clone();
        bus.register_handler(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let failures = bus.emit(&CommandEvent::new("ls", 0, "", "", 0.0));
        assert_eq!(failures, 1);
        assert_eq!(received.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(), 2);
    }
}
