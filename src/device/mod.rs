//! Smart speaker control
//!
//! The playback pipeline only talks to a speaker through the [`Device`]
//! trait. [`HttpDevice`] implements it against a JSON device bridge.

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpDevice;

use crate::Result;
use crate::config::ActionCommand;

/// Status string a device reports while media is playing
pub const STATUS_PLAYING: &str = "playing";

/// Media handed to the device player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayArgs {
    /// Stream audio from a URL
    Url(String),
    /// Speak text with the player's own TTS
    Tts(String),
}

/// Player status as reported by the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceStatus {
    /// Player status, e.g. `"playing"`, `"paused"`, `"idle"`
    pub status: String,

    /// Kind of media the device is playing on its own, if any
    #[serde(default)]
    pub media_type: Option<String>,
}

impl DeviceStatus {
    /// Playback state derived from this status
    #[must_use]
    pub fn playback_state(&self) -> PlaybackState {
        if self.status == STATUS_PLAYING {
            PlaybackState::Playing(self.media_type.clone().filter(|m| !m.is_empty()))
        } else {
            PlaybackState::Idle
        }
    }
}

/// Transient playback state observed on one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Playing; the media type is set when the device started media itself
    Playing(Option<String>),
}

impl PlaybackState {
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        matches!(self, Self::Playing(_))
    }

    /// Media type of unrelated playback the device started on its own
    #[must_use]
    pub fn foreign_media(&self) -> Option<&str> {
        match self {
            Self::Playing(Some(media)) => Some(media),
            _ => None,
        }
    }
}

/// Control surface of a networked speaker
#[async_trait]
pub trait Device: Send + Sync {
    /// Invoke a device action with positional arguments
    async fn do_action(&self, command: ActionCommand, args: &[String]) -> Result<()>;

    /// Read a device property
    async fn get_property(&self, group: u32, property: u32) -> Result<serde_json::Value>;

    /// Start playing media
    async fn play(&self, args: PlayArgs) -> Result<()>;

    /// Pause whatever is playing
    async fn pause(&self) -> Result<()>;

    /// Read player status
    async fn status(&self) -> Result<DeviceStatus>;
}
