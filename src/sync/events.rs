//! Notifications emitted by the synchronization engine

use std::fmt;
use std::sync::Arc;

use crate::mixer::Input;

/// Connection state of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection; the poll loop is stopped
    Disconnected,
    /// Initial snapshot request in flight
    Connecting,
    /// Poll loop running
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// Event delivered to presentation layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Program or preview pointer moved (poll, relist or optimistic update)
    StateChanged {
        active: Option<String>,
        preview: Option<String>,
    },
    /// Full input list replaced
    InputsRefreshed(Vec<Input>),
    ConnectionStatusChanged(ConnectionStatus),
    /// Fade-to-black blink phase toggled; presentation only
    FadeToBlackBlink(bool),
}

/// Subscriber callback. Called synchronously from the emitting task, so it
/// should hand work off (channel send) rather than block.
pub type EventCallback = Arc<dyn Fn(EngineEvent) + Send + Sync>;
