//! vMix state synchronization
//!
//! Owns the mixer connection, the poll loop and the mirrored state:
//! - Program/preview pointers diffed every tick
//! - Input list refreshed on demand
//! - Overlay and fade-to-black flags tracked locally from command results

mod blink;
mod engine;
mod events;
mod poller;


pub use blink::BlinkTimer;
pub use engine::{EngineSettings, PollHealth, SyncEngine};
pub use events::{ConnectionStatus, EngineEvent, EventCallback};
pub use poller::PollOutcome;
