//! Short-lived user notifications ("toasts").
//!
//! A message stays visible for a fixed duration and is then cleared. Showing
//! a new message restarts the clock; a timer never clears a newer message.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Default visibility of a notification.
pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;

#[derive(Clone)]
pub struct Notifier {
    tx: Arc<watch::Sender<Option<String>>>,
    generation: Arc<AtomicU64>,
    duration: Duration,
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            generation: Arc::new(AtomicU64::new(0)),
            duration,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Show a message and schedule its removal. Requires a tokio runtime.
    pub fn show(&self, message: impl Into<String>) {
        let message = message.into();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(message = %message, "Showing notification");
        self.tx.send_replace(Some(message));

        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        let duration = self.duration;
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if current.load(Ordering::Acquire) == generation {
                tx.send_replace(None);
            }
        });
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_NOTIFICATION_MS))
    }
}
