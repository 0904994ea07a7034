//! Voice assistant wake state
//!
//! Synthesized speech played while the assistant is listening can be heard
//! as a new voice command. Before vendor TTS the assistant is pushed out of
//! listening mode, and afterwards it can be woken again so the user can reply.

use std::sync::Arc;

use crate::Result;
use crate::config::ActionCommand;
use crate::device::Device;

/// Phrase the built-in TTS accepts but does not pronounce
pub const UNWAKE_PHRASE: &str = "%";

/// Toggles the assistant's listening state
#[derive(Clone)]
pub struct WakeStateController {
    device: Arc<dyn Device>,
    speak_command: ActionCommand,
    wake_command: ActionCommand,
}

impl WakeStateController {
    #[must_use]
    pub fn new(
        device: Arc<dyn Device>,
        speak_command: ActionCommand,
        wake_command: ActionCommand,
    ) -> Self {
        Self {
            device,
            speak_command,
            wake_command,
        }
    }

    /// Put the assistant into listening mode
    ///
    /// # Errors
    ///
    /// Returns error if the wake action fails
    pub async fn wake_up(&self) -> Result<()> {
        tracing::debug!("waking assistant");
        self.device.do_action(self.wake_command, &[]).await
    }

    /// Take the assistant out of listening mode without audible output
    ///
    /// Pauses current media, then speaks [`UNWAKE_PHRASE`]. Devices may still
    /// occasionally keep listening.
    ///
    /// # Errors
    ///
    /// Returns error if the pause or the speak action fails
    pub async fn un_wake_up(&self) -> Result<()> {
        tracing::debug!("silencing assistant");
        self.device.pause().await?;
        self.device
            .do_action(self.speak_command, &[UNWAKE_PHRASE.to_string()])
            .await
    }
}
