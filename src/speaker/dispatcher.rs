//! Response orchestration
//!
//! Turns a [`ResponseRequest`] into device calls: optional chime, assistant
//! silencing, the play command itself, then monitoring until the audio ends.
//! Vendor TTS text is spoken sentence by sentence through a [`StreamCursor`]
//! so a newer response can take over between (and during) sentences.

use std::sync::Arc;

use super::monitor::{Event, Phase, PlaybackMonitor};
use super::registry::SpeakerRegistry;
use super::request::{
    InterruptionCheck, Payload, PlayOutcome, ResponseOptions, ResponseRequest, normalize_text,
};
use super::segmenter::{CursorPoll, StreamCursor, StreamSegmenter};
use super::session::{SessionGuard, SessionManager};
use super::tts::VendorTts;
use super::wake::WakeStateController;
use crate::clock::Clock;
use crate::config::{ActionCommand, Config, MIN_POLL_INTERVAL, VoiceProvider};
use crate::device::{Device, PlayArgs};
use crate::{Error, Result};

/// Provider actually used for a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderChoice {
    pub provider: VoiceProvider,
    /// Vendor TTS was requested but is not configured
    pub downgraded: bool,
}

/// One payload handed to the device in a single play command
#[derive(Debug, Clone, Copy)]
enum SinglePayload<'a> {
    Audio(&'a str),
    Text(&'a str),
}

/// Drives a speaker through complete responses
pub struct ResponseDispatcher {
    device: Arc<dyn Device>,
    clock: Arc<dyn Clock>,
    wake: WakeStateController,
    monitor: PlaybackMonitor,
    registry: Arc<SpeakerRegistry>,
    sessions: Arc<SessionManager>,
    tts: Option<VendorTts>,
    speak_command: ActionCommand,
    chime_url: Option<String>,
    segmenter: StreamSegmenter,
}

impl ResponseDispatcher {
    /// Build a dispatcher from configuration and collaborators
    ///
    /// Dispatchers driving the same speaker must share `sessions` so that a
    /// response from one supersedes a response from the other.
    ///
    /// # Errors
    ///
    /// Returns error if the configured TTS endpoint is invalid
    pub fn new(
        config: &Config,
        device: Arc<dyn Device>,
        clock: Arc<dyn Clock>,
        registry: Arc<SpeakerRegistry>,
        sessions: Arc<SessionManager>,
    ) -> Result<Self> {
        let tts = config
            .tts_endpoint
            .as_deref()
            .map(VendorTts::new)
            .transpose()?;
        if let Some(tts) = &tts {
            tracing::debug!(endpoint = tts.endpoint(), "vendor TTS enabled");
        }

        let wake = WakeStateController::new(
            Arc::clone(&device),
            config.speak_command,
            config.wake_command,
        );
        let monitor = PlaybackMonitor::new(
            Arc::clone(&device),
            Arc::clone(&clock),
            config.playing_command.clone(),
            config.poll_interval.max(MIN_POLL_INTERVAL),
        );

        Ok(Self {
            device,
            clock,
            wake,
            monitor,
            registry,
            sessions,
            tts,
            speak_command: config.speak_command,
            chime_url: config.chime_url.clone(),
            segmenter: StreamSegmenter::default(),
        })
    }

    /// Use a custom segmenter for vendor TTS text
    #[must_use]
    pub const fn with_segmenter(mut self, segmenter: StreamSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<SpeakerRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn monitor(&self) -> &PlaybackMonitor {
        &self.monitor
    }

    /// Provider used for a request preferring `requested`
    ///
    /// Vendor TTS falls back to the native voice when no endpoint is configured.
    #[must_use]
    pub const fn resolve_provider(&self, requested: VoiceProvider) -> ProviderChoice {
        match requested {
            VoiceProvider::Vendor if self.tts.is_none() => ProviderChoice {
                provider: VoiceProvider::Native,
                downgraded: true,
            },
            provider => ProviderChoice {
                provider,
                downgraded: false,
            },
        }
    }

    /// Chime URL to play around a payload, if the chime policy allows it
    fn chime_for(&self, provider: VoiceProvider, speakable: bool, requested: bool) -> Option<&str> {
        if provider == VoiceProvider::Native || !speakable || !requested {
            return None;
        }
        self.chime_url.as_deref()
    }

    /// Play a response and wait until it finishes or is interrupted
    ///
    /// Starting a response supersedes any response still in flight; the older
    /// one resolves to [`PlayOutcome::Interrupted`] at its next poll.
    ///
    /// # Errors
    ///
    /// Returns error if a device call fails; nothing is retried
    pub async fn respond(&self, request: ResponseRequest) -> Result<PlayOutcome> {
        let session = self.sessions.begin();
        let ResponseRequest { payload, options } = request;

        let Some(payload) = payload else {
            tracing::debug!(session = session.id(), "nothing to play");
            return Ok(PlayOutcome::Skipped);
        };

        let choice = self.resolve_provider(options.provider);
        if choice.downgraded {
            tracing::warn!(
                session = session.id(),
                "vendor TTS endpoint not configured, using native voice"
            );
        }
        let provider = choice.provider;

        let payload = match payload {
            Payload::Text(text) => match normalize_text(&text) {
                None => {
                    tracing::debug!(session = session.id(), "blank text, nothing to play");
                    return Ok(PlayOutcome::Skipped);
                }
                Some(text) if provider == VoiceProvider::Vendor => {
                    Payload::Stream(StreamCursor::from_text_with(self.segmenter, &text))
                }
                Some(text) => Payload::Text(text),
            },
            Payload::Audio(url) if url.trim().is_empty() => {
                tracing::debug!(session = session.id(), "empty audio url, nothing to play");
                return Ok(PlayOutcome::Skipped);
            }
            other => other,
        };

        tracing::info!(session = session.id(), ?provider, "responding");

        match payload {
            Payload::Stream(cursor) => {
                self.stream_response(&cursor, provider, &options, &session)
                    .await
            }
            Payload::Audio(url) => {
                self.dispatch_single(
                    SinglePayload::Audio(&url),
                    provider,
                    &options,
                    &session,
                )
                .await
            }
            Payload::Text(text) => {
                self.dispatch_single(
                    SinglePayload::Text(&text),
                    provider,
                    &options,
                    &session,
                )
                .await
            }
        }
    }

    /// Speak chunks in cursor order, one play command at a time
    async fn stream_response(
        &self,
        cursor: &StreamCursor,
        provider: VoiceProvider,
        options: &ResponseOptions,
        session: &SessionGuard,
    ) -> Result<PlayOutcome> {
        let chime = self.chime_for(provider, true, options.chime);
        let chunk_options = ResponseOptions {
            chime: false,
            keep_awake: false,
            ..options.clone()
        };
        let mut played = 0_usize;

        loop {
            match cursor.next_chunk() {
                CursorPoll::Chunk(text) => {
                    if Self::should_stop(&options.interruption_check, session) {
                        cursor.cancel();
                        return Ok(PlayOutcome::Interrupted);
                    }

                    if played == 0 {
                        if let Some(url) = chime {
                            self.play_chime(url).await?;
                        }
                        if provider != VoiceProvider::Native {
                            self.wake.un_wake_up().await?;
                        }
                    }
                    played += 1;

                    tracing::debug!(session = session.id(), chunk = played, text = %text, "speaking chunk");
                    let outcome = self
                        .dispatch_single(
                            SinglePayload::Text(&text),
                            provider,
                            &chunk_options,
                            session,
                        )
                        .await?;

                    if outcome == PlayOutcome::Interrupted {
                        cursor.cancel();
                        return Ok(PlayOutcome::Interrupted);
                    }
                }
                CursorPoll::Finished => {
                    if cursor.is_cancelled() {
                        tracing::debug!(session = session.id(), "stream cancelled");
                        return Ok(PlayOutcome::Interrupted);
                    }

                    if played > 0
                        && let Some(url) = chime
                    {
                        self.play_chime(url).await?;
                    }
                    if options.keep_awake {
                        self.wake.wake_up().await?;
                    }

                    tracing::debug!(session = session.id(), chunks = played, "stream completed");
                    return Ok(PlayOutcome::Completed);
                }
                CursorPoll::Pending => {
                    if Self::should_stop(&options.interruption_check, session) {
                        cursor.cancel();
                        return Ok(PlayOutcome::Interrupted);
                    }
                    self.clock.sleep(self.monitor.poll_interval()).await;
                }
            }
        }
    }

    /// Issue one play command and monitor it to the end
    async fn dispatch_single(
        &self,
        payload: SinglePayload<'_>,
        provider: VoiceProvider,
        options: &ResponseOptions,
        session: &SessionGuard,
    ) -> Result<PlayOutcome> {
        let speakable = matches!(payload, SinglePayload::Text(_));
        let chime = self.chime_for(provider, speakable, options.chime);
        let phase = Phase::Dispatching;

        if let Some(url) = chime {
            self.play_chime(url).await?;
        }
        if provider != VoiceProvider::Native {
            self.wake.un_wake_up().await?;
        }

        match payload {
            SinglePayload::Audio(url) => {
                self.device.play(PlayArgs::Url(url.to_string())).await?;
            }
            SinglePayload::Text(text) => match provider {
                VoiceProvider::Native => {
                    self.device
                        .do_action(self.speak_command, &[text.to_string()])
                        .await?;
                }
                VoiceProvider::Vendor => {
                    let tts = self
                        .tts
                        .as_ref()
                        .ok_or_else(|| Error::Tts("vendor TTS endpoint not configured".to_string()))?;
                    let voice = options
                        .voice_id
                        .clone()
                        .unwrap_or_else(|| self.registry.active_voice());
                    let url = tts.speech_url(text, &voice);
                    tracing::trace!(voice = %voice, url = %url, "vendor TTS");
                    self.device.play(PlayArgs::Url(url)).await?;
                }
            },
        }

        let phase = phase.next(Event::Dispatched);
        let result = self
            .monitor
            .drive(phase, options.interruption_check.as_ref(), session)
            .await?;

        if result.is_interrupted() {
            return Ok(PlayOutcome::Interrupted);
        }

        if let Some(url) = chime {
            self.play_chime(url).await?;
        }
        if options.keep_awake {
            self.wake.wake_up().await?;
        }

        Ok(PlayOutcome::Completed)
    }

    async fn play_chime(&self, url: &str) -> Result<()> {
        tracing::trace!(url, "boundary chime");
        self.device.play(PlayArgs::Url(url.to_string())).await
    }

    fn should_stop(check: &InterruptionCheck, session: &SessionGuard) -> bool {
        let stop = check() || !session.is_live();
        if stop {
            tracing::debug!(session = session.id(), "response superseded before next chunk");
        }
        stop
    }
}
