//! Poll loop
//!
//! Fetches the snapshot on a fixed interval while connected and diffs the
//! program/preview pointers against the mirrored state. Input list changes are
//! not diffed here; they only arrive through an explicit relist.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use super::engine::SyncEngine;
use super::events::EngineEvent;
use crate::error::MixerError;
use crate::mixer;

/// Result of one poll tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Program or preview moved; a `StateChanged` event was emitted
    Changed,
    Unchanged,
    /// Previous tick still in flight; this one was skipped
    Busy,
    NotConnected,
    /// Snapshot was requested before a more recent local write and was dropped
    Superseded,
    /// Fetch or decode failed; prior state kept
    Failed(MixerError),
}

/// Clears the in-flight flag when the tick finishes, even on early return
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    /// Run a single poll tick
    pub async fn poll_once(&self) -> PollOutcome {
        if !self.is_connected() {
            return PollOutcome::NotConnected;
        }
        let Some(connection) = self.connection() else {
            return PollOutcome::NotConnected;
        };

        if self.poll_in_flight.swap(true, Ordering::SeqCst) {
            trace!("Poll tick skipped: previous fetch still in flight");
            return PollOutcome::Busy;
        }
        let _in_flight = InFlight(&self.poll_in_flight);

        let generation = self.generation.load(Ordering::SeqCst);
        let fetched = match mixer::fetch_state(self.transport.as_ref(), &connection).await {
            Ok(state) => state,
            Err(e) => {
                let failures = self.record_poll_failure();
                if failures == 1 {
                    warn!("vMix poll failed: {}", e);
                } else {
                    debug!("vMix poll failed ({} in a row): {}", failures, e);
                }
                return PollOutcome::Failed(e);
            },
        };
        self.record_poll_success();

        if !self.is_current(&connection) {
            return PollOutcome::NotConnected;
        }

        let changed = {
            let mut state = self.mixer.write();
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("Dropping vMix snapshot older than a local update");
                return PollOutcome::Superseded;
            }
            if state.same_pointers(&fetched) {
                false
            } else {
                *state = Arc::new(state.with_pointers(fetched.active.clone(), fetched.preview.clone()));
                true
            }
        };

        if !changed {
            return PollOutcome::Unchanged;
        }

        debug!(active = ?fetched.active, preview = ?fetched.preview, "vMix state changed");
        self.emit(EngineEvent::StateChanged {
            active: fetched.active,
            preview: fetched.preview,
        });
        PollOutcome::Changed
    }

    /// Start the recurring poll task, replacing any running one
    pub(super) fn start_polling(&self) {
        let engine = self.clone_for_task();
        let period = self.settings.read().poll_interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match engine.poll_once().await {
                    PollOutcome::NotConnected => {
                        debug!("Poll loop stopping: not connected");
                        break;
                    },
                    outcome => trace!(?outcome, "Poll tick"),
                }
            }
        });

        if let Some(previous) = self.poll_task.lock().replace(task) {
            previous.abort();
        }
    }

    pub(super) fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().take() {
            task.abort();
        }
    }
}
