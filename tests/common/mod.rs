//! Shared test utilities
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use beacon_speaker::config::ActionCommand;
use beacon_speaker::speaker::{SessionManager, VoiceCatalog, VoiceCatalogEntry};
use beacon_speaker::{
    Clock, Config, Device, DeviceStatus, Error, PlayArgs, ResponseDispatcher, SpeakerRegistry,
};

pub const TTS_ENDPOINT: &str = "http://tts.local/api";
pub const CHIME_URL: &str = "http://chime.local/ding.mp3";
pub const DEFAULT_VOICE: &str = "BV700_streaming";

/// One call received by [`MockDevice`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Action {
        group: u32,
        action: u32,
        args: Vec<String>,
    },
    Property {
        group: u32,
        property: u32,
    },
    Play(PlayArgs),
    Pause,
    Status,
}

impl Call {
    pub fn action(group: u32, action: u32, args: &[&str]) -> Self {
        Self::Action {
            group,
            action,
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn play_url(url: &str) -> Self {
        Self::Play(PlayArgs::Url(url.to_string()))
    }
}

type StatusHook = Box<dyn FnMut(usize) + Send>;

/// Device that records calls and replays scripted state
///
/// Status and property reads pop from their scripts and report an idle
/// device once a script runs out.
#[derive(Default)]
pub struct MockDevice {
    calls: Mutex<Vec<Call>>,
    statuses: Mutex<VecDeque<DeviceStatus>>,
    properties: Mutex<VecDeque<serde_json::Value>>,
    status_reads: Mutex<usize>,
    on_status: Mutex<Option<StatusHook>>,
    fail_play: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = DeviceStatus>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    pub fn script_properties(&self, values: impl IntoIterator<Item = serde_json::Value>) {
        self.properties.lock().unwrap().extend(values);
    }

    /// Run `hook` with the 1-based read count on every status read
    pub fn on_status(&self, hook: impl FnMut(usize) + Send + 'static) {
        *self.on_status.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn fail_play(&self) {
        self.fail_play.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn plays(&self) -> Vec<PlayArgs> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Play(args) => Some(args),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.calls().iter().filter(|c| *c == wanted).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Device for MockDevice {
    async fn do_action(
        &self,
        command: ActionCommand,
        args: &[String],
    ) -> beacon_speaker::Result<()> {
        self.record(Call::Action {
            group: command.group,
            action: command.action,
            args: args.to_vec(),
        });
        Ok(())
    }

    async fn get_property(
        &self,
        group: u32,
        property: u32,
    ) -> beacon_speaker::Result<serde_json::Value> {
        self.record(Call::Property { group, property });
        Ok(self
            .properties
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn play(&self, args: PlayArgs) -> beacon_speaker::Result<()> {
        self.record(Call::Play(args));
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(Error::Device("player unavailable".to_string()));
        }
        Ok(())
    }

    async fn pause(&self) -> beacon_speaker::Result<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn status(&self) -> beacon_speaker::Result<DeviceStatus> {
        self.record(Call::Status);

        let reads = {
            let mut reads = self.status_reads.lock().unwrap();
            *reads += 1;
            *reads
        };
        if let Some(hook) = self.on_status.lock().unwrap().as_mut() {
            hook(reads);
        }

        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(idle))
    }
}

pub fn idle() -> DeviceStatus {
    DeviceStatus {
        status: "idle".to_string(),
        media_type: None,
    }
}

pub fn playing() -> DeviceStatus {
    DeviceStatus {
        status: "playing".to_string(),
        media_type: None,
    }
}

pub fn playing_media(media: &str) -> DeviceStatus {
    DeviceStatus {
        status: "playing".to_string(),
        media_type: Some(media.to_string()),
    }
}

/// Clock that records requested sleeps and only yields
#[derive(Default)]
pub struct ManualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Catalog serving a fixed voice list
pub struct MockCatalog {
    voices: Vec<VoiceCatalogEntry>,
}

#[async_trait]
impl VoiceCatalog for MockCatalog {
    async fn fetch(&self) -> beacon_speaker::Result<Vec<VoiceCatalogEntry>> {
        Ok(self.voices.clone())
    }
}

pub fn catalog() -> Arc<dyn VoiceCatalog> {
    Arc::new(MockCatalog {
        voices: vec![
            VoiceCatalogEntry {
                name: "Maomao".to_string(),
                speaker: "zh_female_maomao_x".to_string(),
            },
            VoiceCatalogEntry {
                name: "Default".to_string(),
                speaker: DEFAULT_VOICE.to_string(),
            },
        ],
    })
}

/// Vendor TTS configured, no chime
pub fn vendor_config() -> Config {
    Config {
        tts_endpoint: Some(TTS_ENDPOINT.to_string()),
        default_voice: DEFAULT_VOICE.to_string(),
        ..Config::default()
    }
}

/// Everything a dispatcher test needs to inspect
pub struct Harness {
    pub dispatcher: ResponseDispatcher,
    pub device: Arc<MockDevice>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(config: &Config) -> Harness {
    harness_on(config, MockDevice::new(), SessionManager::new())
}

/// Harness driving `device` and sharing `sessions` with other dispatchers
pub fn harness_on(
    config: &Config,
    device: Arc<MockDevice>,
    sessions: Arc<SessionManager>,
) -> Harness {
    let clock = ManualClock::new();
    let registry = Arc::new(SpeakerRegistry::new(
        config.default_voice.clone(),
        Some(catalog()),
    ));
    let dispatcher = ResponseDispatcher::new(
        config,
        Arc::clone(&device) as Arc<dyn Device>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        registry,
        sessions,
    )
    .expect("failed to build dispatcher");

    Harness {
        dispatcher,
        device,
        clock,
    }
}
