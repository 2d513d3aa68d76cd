//! Synchronization engine core struct, connection lifecycle and local state
//!
//! The engine is the single owner of the mixer connection and of every piece of
//! mirrored state. State is stored behind `Arc`s and only ever replaced
//! wholesale, so concurrent writers (poll tick vs. dispatcher) resolve as
//! last-writer-wins without partial updates.

use chrono::{DateTime, Local};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::blink::BlinkTimer;
use super::events::{ConnectionStatus, EngineEvent, EventCallback};
use crate::error::{MixerError, Result};
use crate::mixer::{
    self, decode, Command, Connection, Credentials, FadeToBlackState, Input, MixerState,
    OverlayState, Transport, API_PATH,
};

/// Tunables applied when a connection is (re)built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub poll_interval: Duration,
    pub blink_interval: Duration,
    pub timeout: Duration,
    pub credentials: Credentials,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            blink_interval: Duration::from_millis(500),
            timeout: Duration::from_secs(5),
            credentials: Credentials::default(),
        }
    }
}

/// Poll success/failure bookkeeping for caller-owned reconnect policies
#[derive(Debug, Clone, Default)]
pub struct PollHealth {
    pub consecutive_failures: u32,
    pub last_contact: Option<Instant>,
    pub last_contact_at: Option<DateTime<Local>>,
}

impl PollHealth {
    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_contact = Some(Instant::now());
        self.last_contact_at = Some(Local::now());
    }

    fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }
}

/// vMix state synchronization engine
pub struct SyncEngine {
    pub(super) transport: Arc<dyn Transport>,
    pub(super) settings: Arc<RwLock<EngineSettings>>,

    // Connection (recreated on every connect)
    pub(super) connection: Arc<RwLock<Option<Arc<Connection>>>>,
    pub(super) last_address: Arc<RwLock<Option<(String, u16)>>>,
    pub(super) status: Arc<RwLock<ConnectionStatus>>,

    // Mirrored and locally tracked state
    pub(super) mixer: Arc<RwLock<Arc<MixerState>>>,
    pub(super) overlays: Arc<RwLock<OverlayState>>,
    pub(super) ftb: Arc<RwLock<FadeToBlackState>>,
    pub(super) blink: BlinkTimer,

    /// Bumped on every local write to `mixer`; lets a poll tick detect that its
    /// snapshot predates a newer write
    pub(super) generation: Arc<AtomicU64>,

    // Subscribers
    pub(super) callbacks: Arc<RwLock<Vec<EventCallback>>>,

    // Poll loop
    pub(super) poll_task: Arc<Mutex<Option<JoinHandle<()>>>>,
    pub(super) poll_in_flight: Arc<AtomicBool>,
    pub(super) health: Arc<Mutex<PollHealth>>,
}

impl SyncEngine {
    pub fn new(transport: Arc<dyn Transport>, settings: EngineSettings) -> Self {
        Self {
            transport,
            settings: Arc::new(RwLock::new(settings)),
            connection: Arc::new(RwLock::new(None)),
            last_address: Arc::new(RwLock::new(None)),
            status: Arc::new(RwLock::new(ConnectionStatus::Disconnected)),
            mixer: Arc::new(RwLock::new(Arc::new(MixerState::default()))),
            overlays: Arc::new(RwLock::new(OverlayState::default())),
            ftb: Arc::new(RwLock::new(FadeToBlackState::default())),
            blink: BlinkTimer::new(),
            generation: Arc::new(AtomicU64::new(0)),
            callbacks: Arc::new(RwLock::new(Vec::new())),
            poll_task: Arc::new(Mutex::new(None)),
            poll_in_flight: Arc::new(AtomicBool::new(false)),
            health: Arc::new(Mutex::new(PollHealth::default())),
        }
    }

    /// Clone all Arc fields for spawning background tasks
    pub(super) fn clone_for_task(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            settings: Arc::clone(&self.settings),
            connection: Arc::clone(&self.connection),
            last_address: Arc::clone(&self.last_address),
            status: Arc::clone(&self.status),
            mixer: Arc::clone(&self.mixer),
            overlays: Arc::clone(&self.overlays),
            ftb: Arc::clone(&self.ftb),
            blink: self.blink.clone(),
            generation: Arc::clone(&self.generation),
            callbacks: Arc::clone(&self.callbacks),
            poll_task: Arc::clone(&self.poll_task),
            poll_in_flight: Arc::clone(&self.poll_in_flight),
            health: Arc::clone(&self.health),
        }
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    pub fn subscribe(&self, callback: EventCallback) {
        self.callbacks.write().push(callback);
    }

    pub(super) fn emit(&self, event: EngineEvent) {
        Self::emit_to(&self.callbacks, event);
    }

    fn emit_to(callbacks: &RwLock<Vec<EventCallback>>, event: EngineEvent) {
        // Snapshot the list so callbacks may subscribe without deadlocking
        let callbacks: Vec<EventCallback> = callbacks.read().iter().cloned().collect();
        for callback in callbacks {
            callback(event.clone());
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            debug!("vMix connection status: {} → {}", previous, status);
            self.emit(EngineEvent::ConnectionStatusChanged(status));
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn connection(&self) -> Option<Arc<Connection>> {
        self.connection.read().clone()
    }

    /// Current mixer view; cheap to clone, never mutated in place
    pub fn state(&self) -> Arc<MixerState> {
        self.mixer.read().clone()
    }

    pub fn overlays(&self) -> OverlayState {
        *self.overlays.read()
    }

    pub fn fade_to_black(&self) -> FadeToBlackState {
        *self.ftb.read()
    }

    /// Presentation-only blink phase of the FTB indicator
    pub fn blink_phase(&self) -> bool {
        self.blink.phase()
    }

    pub fn health(&self) -> PollHealth {
        self.health.lock().clone()
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings.read().clone()
    }

    /// Replace the settings; they take effect on the next connect
    pub fn update_settings(&self, settings: EngineSettings) {
        *self.settings.write() = settings;
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Connect to the mixer at `host:port`
    ///
    /// Performs one snapshot request. On success the engine is `Connected`, the
    /// mirrored state is seeded from that snapshot, overlay/FTB flags are reset and
    /// the poll loop starts. On failure the engine stays `Disconnected`.
    pub async fn connect(&self, host: &str, port: u16) -> Result<()> {
        let host = host.trim();
        validate_address(host, port)?;

        self.stop_polling();
        self.blink.stop();
        *self.connection.write() = None;
        *self.last_address.write() = Some((host.to_string(), port));
        self.set_status(ConnectionStatus::Connecting);

        let settings = self.settings();
        let connection = Arc::new(Connection::new(
            host,
            port,
            settings.credentials,
            settings.timeout,
        ));
        info!("🎬 Connecting to vMix at {}", connection.address());

        let body = match self.transport.request(&connection, API_PATH).await {
            Ok(body) => body,
            Err(e) => {
                warn!("❌ Failed to connect to vMix at {}: {}", connection.address(), e);
                self.set_status(ConnectionStatus::Disconnected);
                return Err(MixerError::NoResponse(e));
            },
        };

        let state = decode(&body).unwrap_or_else(|e| {
            warn!("Connected to vMix but the snapshot could not be read: {}", e);
            MixerState::default()
        });

        *self.connection.write() = Some(Arc::clone(&connection));
        {
            let mut mixer = self.mixer.write();
            *mixer = Arc::new(state.clone());
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
        *self.overlays.write() = OverlayState::default();
        *self.ftb.write() = FadeToBlackState::default();
        self.health.lock().record_success();

        self.set_status(ConnectionStatus::Connected);
        info!(
            "✅ Connected to vMix at {} ({} inputs)",
            connection.address(),
            state.inputs.len()
        );

        self.emit(EngineEvent::InputsRefreshed(state.inputs));
        self.emit(EngineEvent::StateChanged {
            active: state.active,
            preview: state.preview,
        });

        self.start_polling();
        Ok(())
    }

    /// Tear down and connect again to the last address with a fresh connection
    pub async fn reconnect(&self) -> Result<()> {
        let (host, port) = self
            .last_address
            .read()
            .clone()
            .ok_or_else(|| MixerError::precondition("no mixer address to reconnect to"))?;

        info!("🔄 Reconnecting to vMix at {}:{}", host, port);
        self.disconnect();
        self.connect(&host, port).await
    }

    /// Stop polling and drop the connection. FTB is cleared together with its
    /// blink timer; overlay flags are kept until the next connect reseeds them.
    pub fn disconnect(&self) {
        self.stop_polling();
        self.set_fade_to_black(false);
        if self.connection.write().take().is_some() {
            info!("🔌 Disconnected from vMix");
        }
        self.set_status(ConnectionStatus::Disconnected);
    }

    pub(crate) fn require_connection(&self) -> Result<Arc<Connection>> {
        if !self.is_connected() {
            return Err(MixerError::precondition("not connected to mixer"));
        }
        self.connection()
            .ok_or_else(|| MixerError::precondition("not connected to mixer"))
    }

    pub(super) fn is_current(&self, connection: &Arc<Connection>) -> bool {
        self.connection
            .read()
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, connection))
    }

    pub(super) fn record_poll_success(&self) {
        self.health.lock().record_success();
    }

    pub(super) fn record_poll_failure(&self) -> u32 {
        self.health.lock().record_failure()
    }

    // =========================================================================
    // Snapshots and commands
    // =========================================================================

    /// Refresh the full input list
    ///
    /// Inputs, program and preview all come from the same single snapshot.
    pub async fn list_inputs(&self) -> Result<Vec<Input>> {
        let connection = self.require_connection()?;

        let fetched = match mixer::fetch_state(self.transport.as_ref(), &connection).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to list vMix inputs: {}", e);
                return Err(e);
            },
        };
        self.record_poll_success();

        if !self.is_current(&connection) {
            return Err(MixerError::precondition("connection changed while listing inputs"));
        }

        let previous = {
            let mut mixer = self.mixer.write();
            let previous = std::mem::replace(&mut *mixer, Arc::new(fetched.clone()));
            self.generation.fetch_add(1, Ordering::SeqCst);
            previous
        };

        info!("📋 Loaded {} vMix inputs", fetched.inputs.len());
        self.emit(EngineEvent::InputsRefreshed(fetched.inputs.clone()));
        if !previous.same_pointers(&fetched) {
            self.emit(EngineEvent::StateChanged {
                active: fetched.active,
                preview: fetched.preview,
            });
        }

        Ok(fetched.inputs)
    }

    /// Send one command over the current connection
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        let connection = self.require_connection()?;
        match mixer::send_command(self.transport.as_ref(), &connection, command).await {
            Ok(()) => {
                debug!("📤 vMix {} ok", command);
                Ok(())
            },
            Err(e) => {
                warn!("vMix {} failed: {}", command, e);
                Err(e.into())
            },
        }
    }

    // =========================================================================
    // Optimistic local updates (dispatcher side)
    // =========================================================================

    pub(crate) fn apply_local_preview(&self, number: &str) {
        self.apply_local(|state| state.with_pointers(state.active.clone(), Some(number.to_string())));
    }

    pub(crate) fn apply_local_active(&self, number: &str) {
        self.apply_local(|state| state.with_pointers(Some(number.to_string()), state.preview.clone()));
    }

    fn apply_local<F>(&self, update: F)
    where
        F: FnOnce(&MixerState) -> MixerState,
    {
        let change = {
            let mut mixer = self.mixer.write();
            let next = update(&**mixer);
            let changed = !mixer.same_pointers(&next);
            let pointers = (next.active.clone(), next.preview.clone());
            *mixer = Arc::new(next);
            self.generation.fetch_add(1, Ordering::SeqCst);
            changed.then_some(pointers)
        };

        if let Some((active, preview)) = change {
            self.emit(EngineEvent::StateChanged { active, preview });
        }
    }

    /// Apply `update` to the overlay flags under a single write lock
    pub(crate) fn update_overlays<F>(&self, update: F)
    where
        F: FnOnce(OverlayState) -> OverlayState,
    {
        let mut overlays = self.overlays.write();
        *overlays = update(*overlays);
    }

    /// Set the FTB flag and start/stop the blink timer with it
    pub(crate) fn set_fade_to_black(&self, active: bool) {
        self.ftb.write().active = active;
        if active {
            let callbacks = Arc::clone(&self.callbacks);
            let interval = self.settings.read().blink_interval;
            self.blink.start(interval, move |lit| {
                Self::emit_to(&callbacks, EngineEvent::FadeToBlackBlink(lit));
            });
        } else {
            self.blink.stop();
        }
    }
}

fn validate_address(host: &str, port: u16) -> Result<()> {
    if host.is_empty() {
        return Err(MixerError::InvalidAddress("host is empty".to_string()));
    }
    if host.contains(|c: char| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@')) {
        return Err(MixerError::InvalidAddress(format!("'{}' is not a host name", host)));
    }
    if port == 0 {
        return Err(MixerError::InvalidAddress("port must be between 1 and 65535".to_string()));
    }
    Ok(())
}
