//! Playback monitoring
//!
//! After a play command is issued the device gives no completion callback,
//! so the monitor polls it until the audio ends or something interrupts it.
//! The phases form an explicit state machine; [`Phase::next`] is the only
//! place transitions happen, and the async driver just feeds it events.

use std::sync::Arc;
use std::time::Duration;

use super::session::SessionGuard;
use crate::Result;
use crate::clock::Clock;
use crate::config::PropertyCommand;
use crate::device::{Device, PlaybackState};

/// Delay between issuing playback and the first poll, so device state catches up
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Why playback was cut short
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterruptCause {
    /// The caller's interruption check returned true
    Caller,
    /// A newer response session started
    Superseded,
    /// The device started unrelated media on its own
    ForeignMedia(String),
}

/// Terminal result of monitoring one playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorResult {
    Completed,
    Interrupted(InterruptCause),
}

impl MonitorResult {
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

/// Everything one poll tick learned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub caller_interrupted: bool,
    pub superseded: bool,
    pub state: PlaybackState,
}

impl Observation {
    /// Decide whether playback is over
    ///
    /// Checked in a fixed order: caller, supersession, then device
    /// self-started media. A device that is not playing means completion.
    #[must_use]
    pub fn verdict(&self) -> Option<MonitorResult> {
        if self.caller_interrupted {
            return Some(MonitorResult::Interrupted(InterruptCause::Caller));
        }
        if self.superseded {
            return Some(MonitorResult::Interrupted(InterruptCause::Superseded));
        }
        if let Some(media) = self.state.foreign_media() {
            return Some(MonitorResult::Interrupted(InterruptCause::ForeignMedia(
                media.to_string(),
            )));
        }
        if !self.state.is_playing() {
            return Some(MonitorResult::Completed);
        }
        None
    }
}

/// Playback phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Play command not yet issued
    Dispatching,
    /// Issued; waiting for device state to converge
    AwaitingSettle,
    /// Polling device state each interval
    Polling,
    Done(MonitorResult),
}

/// Input to the phase machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Dispatched,
    Settled,
    Observed(Observation),
}

impl Phase {
    /// Transition on `event`; events that don't apply leave the phase unchanged
    #[must_use]
    pub fn next(self, event: Event) -> Self {
        match (self, event) {
            (Self::Dispatching, Event::Dispatched) => Self::AwaitingSettle,
            (Self::AwaitingSettle, Event::Settled) => Self::Polling,
            (Self::Polling, Event::Observed(observation)) => {
                observation.verdict().map_or(Self::Polling, Self::Done)
            }
            (phase, event) => {
                tracing::warn!(?phase, ?event, "ignoring out-of-order playback event");
                phase
            }
        }
    }
}

/// Polls a device until playback completes or is interrupted
#[derive(Clone)]
pub struct PlaybackMonitor {
    device: Arc<dyn Device>,
    clock: Arc<dyn Clock>,
    playing_command: Option<PropertyCommand>,
    poll_interval: Duration,
}

impl PlaybackMonitor {
    #[must_use]
    pub fn new(
        device: Arc<dyn Device>,
        clock: Arc<dyn Clock>,
        playing_command: Option<PropertyCommand>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            device,
            clock,
            playing_command,
            poll_interval,
        }
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Read the current playback state from the device
    ///
    /// Uses the configured property when available, player status otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the device read fails
    pub async fn playback_state(&self) -> Result<PlaybackState> {
        match &self.playing_command {
            Some(command) => {
                let value = self
                    .device
                    .get_property(command.group, command.property)
                    .await?;
                if property_matches(&value, &command.playing_value) {
                    Ok(PlaybackState::Playing(None))
                } else {
                    Ok(PlaybackState::Idle)
                }
            }
            None => Ok(self.device.status().await?.playback_state()),
        }
    }

    /// Drive `phase` until playback is done
    ///
    /// Pass [`Phase::AwaitingSettle`] right after issuing playback, or
    /// [`Phase::Polling`] to skip the settle delay.
    ///
    /// # Errors
    ///
    /// Returns error if a device read fails
    pub async fn drive(
        &self,
        mut phase: Phase,
        interruption_check: &(dyn Fn() -> bool + Send + Sync),
        session: &SessionGuard,
    ) -> Result<MonitorResult> {
        let mut ticks = 0_u64;

        loop {
            phase = match phase {
                Phase::Dispatching => phase.next(Event::Dispatched),
                Phase::AwaitingSettle => {
                    self.clock.sleep(SETTLE_DELAY).await;
                    phase.next(Event::Settled)
                }
                Phase::Polling => {
                    if ticks > 0 {
                        self.clock.sleep(self.poll_interval).await;
                    }
                    ticks += 1;

                    let state = self.playback_state().await?;
                    let observation = Observation {
                        caller_interrupted: interruption_check(),
                        superseded: !session.is_live(),
                        state,
                    };
                    tracing::trace!(session = session.id(), ticks, ?observation, "playback poll");
                    phase.next(Event::Observed(observation))
                }
                Phase::Done(result) => {
                    match &result {
                        MonitorResult::Completed => {
                            tracing::debug!(session = session.id(), ticks, "playback completed");
                        }
                        MonitorResult::Interrupted(cause) => {
                            tracing::info!(
                                session = session.id(),
                                ticks,
                                ?cause,
                                "playback interrupted"
                            );
                        }
                    }
                    return Ok(result);
                }
            };
        }
    }

    /// Poll until playback completes or is interrupted
    ///
    /// # Errors
    ///
    /// Returns error if a device read fails
    pub async fn wait_for_completion(
        &self,
        interruption_check: &(dyn Fn() -> bool + Send + Sync),
        session: &SessionGuard,
    ) -> Result<MonitorResult> {
        self.drive(Phase::Polling, interruption_check, session).await
    }
}

/// Compare a property value against the configured "playing" marker
fn property_matches(value: &serde_json::Value, marker: &str) -> bool {
    match value {
        serde_json::Value::String(s) => s == marker,
        serde_json::Value::Number(n) => marker
            .parse::<serde_json::Number>()
            .is_ok_and(|m| m == *n),
        serde_json::Value::Bool(b) => marker.parse::<bool>().is_ok_and(|m| m == *b),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(caller: bool, superseded: bool, state: PlaybackState) -> Observation {
        Observation {
            caller_interrupted: caller,
            superseded,
            state,
        }
    }

    fn music() -> PlaybackState {
        PlaybackState::Playing(Some("music".to_string()))
    }

    #[test]
    fn caller_check_wins_over_everything() {
        let verdict = observation(true, true, music()).verdict();
        assert_eq!(
            verdict,
            Some(MonitorResult::Interrupted(InterruptCause::Caller))
        );
    }

    #[test]
    fn supersession_wins_over_foreign_media() {
        let verdict = observation(false, true, music()).verdict();
        assert_eq!(
            verdict,
            Some(MonitorResult::Interrupted(InterruptCause::Superseded))
        );
    }

    #[test]
    fn foreign_media_interrupts() {
        let verdict = observation(false, false, music()).verdict();
        assert_eq!(
            verdict,
            Some(MonitorResult::Interrupted(InterruptCause::ForeignMedia(
                "music".to_string()
            )))
        );
    }

    #[test]
    fn idle_device_completes() {
        let verdict = observation(false, false, PlaybackState::Idle).verdict();
        assert_eq!(verdict, Some(MonitorResult::Completed));
    }

    #[test]
    fn plain_playing_keeps_polling() {
        let verdict = observation(false, false, PlaybackState::Playing(None)).verdict();
        assert_eq!(verdict, None);
    }

    #[test]
    fn phase_walks_through_happy_path() {
        let phase = Phase::Dispatching
            .next(Event::Dispatched)
            .next(Event::Settled);
        assert_eq!(phase, Phase::Polling);

        let phase = phase.next(Event::Observed(observation(
            false,
            false,
            PlaybackState::Playing(None),
        )));
        assert_eq!(phase, Phase::Polling);

        let phase = phase.next(Event::Observed(observation(
            false,
            false,
            PlaybackState::Idle,
        )));
        assert_eq!(phase, Phase::Done(MonitorResult::Completed));
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        assert_eq!(Phase::Dispatching.next(Event::Settled), Phase::Dispatching);

        let done = Phase::Done(MonitorResult::Completed);
        assert_eq!(done.clone().next(Event::Dispatched), done);
    }

    #[test]
    fn property_marker_comparison() {
        assert!(property_matches(&serde_json::json!(1), "1"));
        assert!(property_matches(&serde_json::json!("1"), "1"));
        assert!(property_matches(&serde_json::json!(true), "true"));
        assert!(!property_matches(&serde_json::json!(2), "1"));
        assert!(!property_matches(&serde_json::Value::Null, "null"));
        assert!(!property_matches(&serde_json::json!([1]), "[1]"));
        assert!(property_matches(&serde_json::json!(2.5), "2.5"));
    }
}
