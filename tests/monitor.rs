//! Playback monitor and wake state tests

use std::sync::Arc;

use beacon_speaker::config::{ActionCommand, PropertyCommand};
use beacon_speaker::speaker::{
    InterruptCause, MonitorResult, PlaybackMonitor, SessionManager, UNWAKE_PHRASE,
    WakeStateController,
};
use beacon_speaker::{Clock, Device};

mod common;
use common::{Call, ManualClock, MockDevice, playing, playing_media};

const SPEAK: ActionCommand = ActionCommand {
    group: 5,
    action: 1,
};
const WAKE: ActionCommand = ActionCommand {
    group: 5,
    action: 3,
};

fn monitor(device: &Arc<MockDevice>, playing_command: Option<PropertyCommand>) -> PlaybackMonitor {
    PlaybackMonitor::new(
        Arc::clone(device) as Arc<dyn Device>,
        ManualClock::new() as Arc<dyn Clock>,
        playing_command,
        std::time::Duration::from_millis(500),
    )
}

#[tokio::test]
async fn un_wake_pauses_then_speaks_silent_phrase() {
    let device = MockDevice::new();
    let wake = WakeStateController::new(Arc::clone(&device) as Arc<dyn Device>, SPEAK, WAKE);

    wake.un_wake_up().await.unwrap();

    assert_eq!(
        device.calls(),
        vec![Call::Pause, Call::action(5, 1, &[UNWAKE_PHRASE])]
    );
}

#[tokio::test]
async fn wake_up_issues_wake_action() {
    let device = MockDevice::new();
    let wake = WakeStateController::new(Arc::clone(&device) as Arc<dyn Device>, SPEAK, WAKE);

    wake.wake_up().await.unwrap();

    assert_eq!(device.calls(), vec![Call::action(5, 3, &[])]);
}

#[tokio::test]
async fn wait_for_completion_polls_without_settle() {
    let device = MockDevice::new();
    device.script_statuses([playing()]);
    let sessions = SessionManager::new();
    let session = sessions.begin();

    let result = monitor(&device, None)
        .wait_for_completion(&|| false, &session)
        .await
        .unwrap();

    assert_eq!(result, MonitorResult::Completed);
    assert_eq!(device.calls(), vec![Call::Status, Call::Status]);
}

#[tokio::test]
async fn caller_interruption_takes_precedence_over_media() {
    let device = MockDevice::new();
    device.script_statuses([playing_media("music")]);
    let sessions = SessionManager::new();
    let session = sessions.begin();
    let _newer = sessions.begin();

    let result = monitor(&device, None)
        .wait_for_completion(&|| true, &session)
        .await
        .unwrap();

    assert_eq!(result, MonitorResult::Interrupted(InterruptCause::Caller));
}

#[tokio::test]
async fn supersession_takes_precedence_over_media() {
    let device = MockDevice::new();
    device.script_statuses([playing_media("music")]);
    let sessions = SessionManager::new();
    let session = sessions.begin();
    let _newer = sessions.begin();

    let result = monitor(&device, None)
        .wait_for_completion(&|| false, &session)
        .await
        .unwrap();

    assert_eq!(result, MonitorResult::Interrupted(InterruptCause::Superseded));
}

#[tokio::test]
async fn foreign_media_is_reported() {
    let device = MockDevice::new();
    device.script_statuses([playing(), playing_media("radio")]);
    let sessions = SessionManager::new();
    let session = sessions.begin();

    let result = monitor(&device, None)
        .wait_for_completion(&|| false, &session)
        .await
        .unwrap();

    assert_eq!(
        result,
        MonitorResult::Interrupted(InterruptCause::ForeignMedia("radio".to_string()))
    );
}

#[tokio::test]
async fn property_state_reads_configured_property() {
    let device = MockDevice::new();
    device.script_properties([serde_json::json!("1")]);
    let sessions = SessionManager::new();
    let session = sessions.begin();

    let monitor = monitor(&device, Some("2-1-1".parse().unwrap()));
    assert!(monitor.playback_state().await.unwrap().is_playing());
    assert!(!monitor.playback_state().await.unwrap().is_playing());

    let result = monitor.wait_for_completion(&|| false, &session).await.unwrap();
    assert_eq!(result, MonitorResult::Completed);
    assert_eq!(
        device.count(&Call::Property {
            group: 2,
            property: 1
        }),
        3
    );
}
