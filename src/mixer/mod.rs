//! vMix protocol layer
//!
//! Provides the pieces the synchronization engine and dispatcher are built from:
//! - [`Transport`]: one HTTP GET with timeout
//! - [`decode`]: XML snapshot → [`MixerState`]
//! - [`encode`] / [`Command`]: function calls → request paths

mod decoder;
mod encoder;
mod transport;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use decoder::decode;
pub use encoder::{encode, Command, API_PATH};
pub use transport::{HttpTransport, Transport};
pub use types::{
    Connection, Credentials, FadeToBlackState, Input, MixerState, OverlayState, OVERLAY_LAYERS,
};

use crate::error::{MixerError, TransportError};
use tracing::debug;

/// Fetch and decode the full state snapshot
pub async fn fetch_state(
    transport: &dyn Transport,
    connection: &Connection,
) -> Result<MixerState, MixerError> {
    let body = transport.request(connection, API_PATH).await?;
    let state = decode(&body)?;
    debug!(
        inputs = state.inputs.len(),
        active = ?state.active,
        preview = ?state.preview,
        "Decoded vMix snapshot"
    );
    Ok(state)
}

/// Send one function call; success means HTTP 200
pub async fn send_command(
    transport: &dyn Transport,
    connection: &Connection,
    command: &Command,
) -> Result<(), TransportError> {
    transport.request(connection, &command.to_path()).await.map(|_| ())
}
