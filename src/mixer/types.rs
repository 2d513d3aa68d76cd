//! Mixer data model
//!
//! Defines the connection parameters, the decoded state snapshot and the
//! locally tracked overlay / fade-to-black flags.

use std::time::Duration;

/// Number of overlay layers exposed by vMix
pub const OVERLAY_LAYERS: u8 = 4;

/// Optional HTTP basic-auth credentials, passed through as-is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Credentials are only sent when a username is configured
    pub fn is_set(&self) -> bool {
        !self.username.is_empty()
    }
}

/// Parameters of one mixer connection. Immutable; a reconnect builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl Connection {
    pub fn new(host: impl Into<String>, port: u16, credentials: Credentials, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            timeout,
        }
    }

    /// Base URL without the `/api/` path, e.g. `http://127.0.0.1:8088`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// One vMix input as listed in the XML snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    /// Stable identifier; not necessarily sequential
    pub number: String,
    pub title: String,
    pub short_title: String,
    pub input_type: String,
    pub state: String,
    pub duration: String,
    pub position: String,
    pub key: String,
}

impl Input {
    /// Label shown on tiles and status lines: short title if present, else title
    pub fn display_title(&self) -> &str {
        if self.short_title.is_empty() {
            &self.title
        } else {
            &self.short_title
        }
    }
}

/// Decoded mixer snapshot. Always replaced wholesale, never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MixerState {
    /// Inputs in document order
    pub inputs: Vec<Input>,
    pub active: Option<String>,
    pub preview: Option<String>,
}

impl MixerState {
    pub fn input(&self, number: &str) -> Option<&Input> {
        self.inputs.iter().find(|input| input.number == number)
    }

    /// Copy of this state with different program/preview pointers
    pub fn with_pointers(&self, active: Option<String>, preview: Option<String>) -> Self {
        Self {
            inputs: self.inputs.clone(),
            active,
            preview,
        }
    }

    pub fn same_pointers(&self, other: &MixerState) -> bool {
        self.active == other.active && self.preview == other.preview
    }

    /// "V3: Camera 1" for a listed input, "V7: unknown" for a stale pointer
    pub fn label_for(&self, number: &str) -> String {
        match self.input(number) {
            Some(input) => format!("V{}: {}", number, input.display_title()),
            None => format!("V{}: unknown", number),
        }
    }

    pub fn preview_label(&self) -> String {
        self.preview
            .as_deref()
            .map(|n| self.label_for(n))
            .unwrap_or_else(|| "Not selected".to_string())
    }

    pub fn active_label(&self) -> String {
        self.active
            .as_deref()
            .map(|n| self.label_for(n))
            .unwrap_or_else(|| "No data".to_string())
    }
}

/// Per-layer overlay flags, tracked locally from command results only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    layers: [bool; OVERLAY_LAYERS as usize],
}

impl OverlayState {
    pub fn is_valid_layer(layer: u8) -> bool {
        (1..=OVERLAY_LAYERS).contains(&layer)
    }

    /// Flag for a layer; out-of-range layers read as false
    pub fn is_on(&self, layer: u8) -> bool {
        Self::is_valid_layer(layer) && self.layers[(layer - 1) as usize]
    }

    pub fn with_toggled(mut self, layer: u8) -> Self {
        if Self::is_valid_layer(layer) {
            let idx = (layer - 1) as usize;
            self.layers[idx] = !self.layers[idx];
        }
        self
    }

    pub fn with_cleared(mut self, layer: u8) -> Self {
        if Self::is_valid_layer(layer) {
            self.layers[(layer - 1) as usize] = false;
        }
        self
    }

    pub fn any_on(&self) -> bool {
        self.layers.iter().any(|on| *on)
    }

    /// (layer, flag) pairs for layers 1..=4
    pub fn iter(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        self.layers.iter().enumerate().map(|(idx, on)| (idx as u8 + 1, *on))
    }
}

/// Fade-to-black flag. The blink phase lives in the blink timer, not here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FadeToBlackState {
    pub active: bool,
}
