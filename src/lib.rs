//! vMix Remote - remote control core for the vMix video mixer
//!
//! Mirrors program/preview/input state over the vMix HTTP API and sends
//! function calls (preview, fade/cut, overlays, fade to black).

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mixer;
pub mod paths;
pub mod sync;

pub use dispatcher::{Dispatcher, Outcome};
pub use error::{DecodeError, MixerError, TransportError};
pub use sync::{ConnectionStatus, EngineEvent, SyncEngine};
