//! Fade-to-black blink timer
//!
//! A purely local toggle used to flash the FTB indicator. vMix does not expose a
//! blink phase, so nothing here is ever synchronized with the mixer.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

#[derive(Clone, Default)]
pub struct BlinkTimer {
    phase: Arc<AtomicBool>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BlinkTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start toggling every `interval`; no-op if already running
    pub fn start<F>(&self, interval: Duration, on_toggle: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let phase = Arc::clone(&self.phase);
        *task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let lit = !phase.fetch_xor(true, Ordering::SeqCst);
                trace!(lit, "FTB blink");
                on_toggle(lit);
            }
        }));
    }

    /// Stop toggling and reset the phase to unlit
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.phase.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    pub fn phase(&self) -> bool {
        self.phase.load(Ordering::SeqCst)
    }
}
