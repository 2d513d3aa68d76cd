//! Error taxonomy shared by the transport, decoder, engine and dispatcher
//!
//! Every failure in the core is recoverable: the poll loop turns it into a skipped
//! tick, the dispatcher into a failed `Result` with a status-bar message.

use thiserror::Error;

/// Result alias for core operations
pub type Result<T> = std::result::Result<T, MixerError>;

/// Failure classes reported by a [`crate::mixer::Transport`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Host unreachable, connection refused, DNS failure, ...
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// No response within the connection timeout
    #[error("request timed out")]
    TimedOut,

    /// The mixer answered with a non-200 status
    #[error("HTTP error {0}")]
    HttpError(u16),

    #[error("unknown transport error: {0}")]
    Unknown(String),
}

impl TransportError {
    /// Whether the request never produced an HTTP answer.
    ///
    /// `HttpError` means the mixer is reachable and rejected one command;
    /// everything else means the link itself is broken.
    pub fn is_hard(&self) -> bool {
        !matches!(self, TransportError::HttpError(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::TimedOut
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::HttpError(status.as_u16())
        } else {
            TransportError::Unknown(err.to_string())
        }
    }
}

/// XML snapshot decoding errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The document is not well-formed XML
    #[error("failed to parse mixer XML: {0}")]
    ParseFailure(String),
}

impl From<quick_xml::Error> for DecodeError {
    fn from(err: quick_xml::Error) -> Self {
        DecodeError::ParseFailure(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DecodeError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DecodeError::ParseFailure(err.to_string())
    }
}

/// Errors surfaced by the synchronization engine and the command dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MixerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Local validation failed; nothing was sent
    #[error("{0}")]
    PreconditionFailed(String),

    /// The address cannot be used to build a connection
    #[error("invalid mixer address: {0}")]
    InvalidAddress(String),

    /// The address is well-formed but the mixer did not answer
    #[error("no response from mixer: {0}")]
    NoResponse(TransportError),
}

impl MixerError {
    pub fn precondition(reason: impl Into<String>) -> Self {
        MixerError::PreconditionFailed(reason.into())
    }

    /// Short text suitable for a status bar
    pub fn status_message(&self) -> String {
        match self {
            MixerError::PreconditionFailed(reason) => reason.clone(),
            MixerError::InvalidAddress(reason) => format!("Invalid address: {}", reason),
            MixerError::NoResponse(_) => "Failed to connect to vMix".to_string(),
            MixerError::Transport(TransportError::TimedOut) => "vMix did not answer in time".to_string(),
            MixerError::Transport(TransportError::HttpError(status)) => {
                format!("vMix rejected the command (HTTP {})", status)
            },
            MixerError::Transport(_) => "Connection error".to_string(),
            MixerError::Decode(_) => "Unreadable response from vMix".to_string(),
        }
    }
}
