//! Command dispatcher - user intents to vMix function calls
//!
//! Each method is one user action: a single attempt, plus at most one documented
//! fallback. Local state is updated only after the mixer confirmed the command,
//! except for fade-to-black which flips first and reverts on failure.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{MixerError, Result};
use crate::mixer::{Command, OverlayState, OVERLAY_LAYERS};
use crate::sync::SyncEngine;

#[cfg(test)]
mod tests;

/// Successful dispatcher result, with a message for the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub message: String,
}

impl Outcome {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Executes user intents against the engine's connection
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<SyncEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Put an input into preview (tile click)
    pub async fn preview_input(&self, number: &str) -> Result<Outcome> {
        self.engine.require_connection()?;
        let number = number.trim();
        if number.is_empty() {
            return Err(MixerError::precondition("no input selected"));
        }

        self.engine
            .send_command(&Command::PreviewInput {
                input: number.to_string(),
            })
            .await?;
        self.engine.apply_local_preview(number);

        Ok(Outcome::new(format!("📺 Set to preview: V{}", number)))
    }

    /// Take the preview input to program: fade, falling back to a hard cut
    pub async fn quick_play(&self) -> Result<Outcome> {
        self.engine.require_connection()?;
        let preview = self
            .engine
            .state()
            .preview
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MixerError::precondition("no preview selected"))?;

        let fade = Command::Fade {
            input: preview.clone(),
        };
        let message = match self.engine.send_command(&fade).await {
            Ok(()) => format!("🔄 Smooth transition to V{}", preview),
            Err(fade_err) => {
                warn!("Fade to V{} failed ({}), falling back to cut", preview, fade_err);
                let cut = Command::Cut {
                    input: preview.clone(),
                };
                self.engine.send_command(&cut).await?;
                format!("✅ Cut transition to V{}", preview)
            },
        };

        self.engine.apply_local_active(&preview);
        info!("{}", message);
        Ok(Outcome::new(message))
    }

    /// Toggle fade to black
    ///
    /// The flag flips before the request. On failure it ends up off whichever
    /// way the toggle went: a failed enable reverts, a failed disable stays off.
    pub async fn toggle_fade_to_black(&self) -> Result<Outcome> {
        self.engine.require_connection()?;

        let enable = !self.engine.fade_to_black().active;
        self.engine.set_fade_to_black(enable);

        if let Err(e) = self.engine.send_command(&Command::FadeToBlack).await {
            self.engine.set_fade_to_black(false);
            return Err(e);
        }

        let message = if enable {
            "🌙 Fade To Black enabled"
        } else {
            "🌙 Fade To Black disabled"
        };
        info!("{}", message);
        Ok(Outcome::new(message))
    }

    /// Toggle the preview input on one overlay layer (1..=4)
    pub async fn toggle_overlay(&self, layer: u8) -> Result<Outcome> {
        self.engine.require_connection()?;
        if !OverlayState::is_valid_layer(layer) {
            return Err(MixerError::precondition(format!(
                "overlay layer must be between 1 and {}",
                OVERLAY_LAYERS
            )));
        }
        let preview = self
            .engine
            .state()
            .preview
            .clone()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MixerError::precondition("no preview selected"))?;

        self.engine
            .send_command(&Command::OverlayIn {
                layer,
                input: preview.clone(),
            })
            .await?;
        self.engine.update_overlays(|overlays| overlays.with_toggled(layer));

        Ok(Outcome::new(format!("➕ Overlay on layer {}: V{}", layer, preview)))
    }

    /// Take every overlay layer out
    ///
    /// All layers are attempted and all local flags cleared whatever each
    /// command returns. Fails only if some layer never reached the mixer.
    pub async fn remove_all_overlays(&self) -> Result<Outcome> {
        self.engine.require_connection()?;

        let mut hard_failure = None;
        let mut rejected = Vec::new();

        for layer in 1..=OVERLAY_LAYERS {
            let result = self.engine.send_command(&Command::OverlayOut { layer }).await;
            self.engine.update_overlays(|overlays| overlays.with_cleared(layer));

            match result {
                Ok(()) => {},
                Err(MixerError::Transport(e)) if !e.is_hard() => rejected.push(layer),
                Err(e) => {
                    if hard_failure.is_none() {
                        hard_failure = Some(e);
                    }
                },
            }
        }

        if let Some(e) = hard_failure {
            return Err(e);
        }
        if !rejected.is_empty() {
            warn!("vMix rejected overlay removal on layers {:?}", rejected);
        }
        Ok(Outcome::new("✖ All overlays removed"))
    }
}
