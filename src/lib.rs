//! Beacon Speaker - spoken responses on networked smart speakers
//!
//! This library turns "say this to the user" requests into device actions:
//! - Sentence segmentation for streaming vendor TTS
//! - Assistant wake state management around synthesized speech
//! - Playback monitoring with interruption detection
//! - Response sessions where the newest response always wins
//! - Vendor voice selection against a remote catalog
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Callers                         │
//! │        CLI  │  Assistant runtime  │  ...             │
//! └────────────────────┬────────────────────────────────┘
//!                      │ ResponseRequest
//! ┌────────────────────▼────────────────────────────────┐
//! │                Response Dispatcher                   │
//! │   Segmenter  │  Wake State  │  Monitor  │  Voices   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          Device bridge  │  Vendor TTS                │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod speaker;

pub use clock::{Clock, TokioClock};
pub use config::{Config, VoiceProvider};
pub use device::{Device, DeviceStatus, HttpDevice, PlayArgs, PlaybackState};
pub use error::{Error, Result};
pub use speaker::{
    PlayOutcome, ResponseDispatcher, ResponseRequest, SpeakerRegistry, StreamCursor,
    StreamSegmenter,
};
