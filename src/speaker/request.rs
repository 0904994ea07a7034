//! Response requests and outcomes

use std::fmt;
use std::sync::Arc;

use super::segmenter::StreamCursor;
use crate::config::VoiceProvider;

/// Caller-supplied predicate; returning true interrupts playback
pub type InterruptionCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// What the speaker should play
#[derive(Debug, Clone)]
pub enum Payload {
    /// Text to synthesize
    Text(String),
    /// Pre-rendered audio to stream
    Audio(String),
    /// Text arriving chunk by chunk
    Stream(StreamCursor),
}

/// Options shared by every payload kind
#[derive(Clone)]
pub struct ResponseOptions {
    /// Preferred TTS engine (may be downgraded to native)
    pub provider: VoiceProvider,

    /// Vendor voice for this response only; defaults to the registry's voice
    pub voice_id: Option<String>,

    /// Put the assistant back into listening mode afterwards
    pub keep_awake: bool,

    /// Play the boundary chime around synthesized speech
    pub chime: bool,

    /// Polled every tick; true interrupts playback
    pub interruption_check: InterruptionCheck,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            provider: VoiceProvider::default(),
            voice_id: None,
            keep_awake: false,
            chime: false,
            interruption_check: Arc::new(|| false),
        }
    }
}

impl fmt::Debug for ResponseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseOptions")
            .field("provider", &self.provider)
            .field("voice_id", &self.voice_id)
            .field("keep_awake", &self.keep_awake)
            .field("chime", &self.chime)
            .finish_non_exhaustive()
    }
}

/// One "say this to the user" request
#[derive(Debug, Clone, Default)]
pub struct ResponseRequest {
    /// Nothing to play when `None`
    pub payload: Option<Payload>,
    pub options: ResponseOptions,
}

impl ResponseRequest {
    /// Speak `text`
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_payload(Payload::Text(text.into()))
    }

    /// Play audio from `url`
    #[must_use]
    pub fn audio(url: impl Into<String>) -> Self {
        Self::with_payload(Payload::Audio(url.into()))
    }

    /// Speak chunks as `cursor` produces them
    #[must_use]
    pub fn stream(cursor: StreamCursor) -> Self {
        Self::with_payload(Payload::Stream(cursor))
    }

    fn with_payload(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            options: ResponseOptions::default(),
        }
    }

    #[must_use]
    pub const fn provider(mut self, provider: VoiceProvider) -> Self {
        self.options.provider = provider;
        self
    }

    #[must_use]
    pub fn voice(mut self, voice_id: impl Into<String>) -> Self {
        self.options.voice_id = Some(voice_id.into());
        self
    }

    #[must_use]
    pub const fn keep_awake(mut self, keep_awake: bool) -> Self {
        self.options.keep_awake = keep_awake;
        self
    }

    #[must_use]
    pub const fn chime(mut self, chime: bool) -> Self {
        self.options.chime = chime;
        self
    }

    #[must_use]
    pub fn interrupt_when(mut self, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.options.interruption_check = Arc::new(check);
        self
    }
}

/// How a response ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Everything was played
    Completed,
    /// A newer response, the caller, or the device cut playback short
    Interrupted,
    /// There was nothing to play
    Skipped,
}

/// Collapse blank lines and trim; `None` when nothing speakable remains
#[must_use]
pub fn normalize_text(text: &str) -> Option<String> {
    let normalized = text
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let normalized = normalized.trim();

    (!normalized.is_empty()).then(|| normalized.to_string())
}
