//! Configuration management for Beacon speaker
//!
//! Values come from an optional TOML file and are then overridden by
//! `SPEAKER_*` environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Lowest poll interval the playback monitor accepts
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Poll interval used when none is configured
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default bridge address for the device control service
const DEFAULT_DEVICE_URL: &str = "http://localhost:8087";

/// Voice used for vendor TTS until a different one is selected
const DEFAULT_VOICE: &str = "BV700_streaming";

/// Text-to-speech engine used for spoken responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProvider {
    /// The speaker's own built-in assistant voice
    Native,
    /// Externally hosted TTS whose audio URL is played by the device
    #[default]
    Vendor,
}

impl FromStr for VoiceProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" | "xiaoai" | "builtin" => Ok(Self::Native),
            "vendor" | "custom" | "edge" | "volcano" => Ok(Self::Vendor),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Device action addressed by service group and action id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionCommand {
    pub group: u32,
    pub action: u32,
}

impl FromStr for ActionCommand {
    type Err = Error;

    /// Parse `"<group>-<action>"`, e.g. `"5-1"`
    fn from_str(s: &str) -> Result<Self> {
        let parts = split_ids(s, 2)?;
        Ok(Self {
            group: parts[0],
            action: parts[1],
        })
    }
}

/// Property read that reports whether the device is playing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCommand {
    pub group: u32,
    pub property: u32,
    /// Property value that means "playing"
    pub playing_value: String,
}

impl FromStr for PropertyCommand {
    type Err = Error;

    /// Parse `"<group>-<property>-<playing value>"`, e.g. `"3-1-1"`
    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.trim().splitn(3, '-');
        let (Some(group), Some(property), Some(value)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::Config(format!(
                "expected <group>-<property>-<value>, got {s:?}"
            )));
        };

        Ok(Self {
            group: parse_id(group, s)?,
            property: parse_id(property, s)?,
            playing_value: value.trim().to_string(),
        })
    }
}

/// Beacon speaker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the device control bridge
    pub device_url: String,

    /// Preferred TTS engine
    pub provider: VoiceProvider,

    /// Vendor TTS endpoint; vendor TTS is unavailable without it
    pub tts_endpoint: Option<String>,

    /// Voice catalog endpoint used to switch voices by name
    pub voices_endpoint: Option<String>,

    /// Voice id used for vendor TTS until switched
    pub default_voice: String,

    /// Built-in TTS action (text is passed as the single argument)
    pub speak_command: ActionCommand,

    /// Action that puts the assistant into listening mode
    pub wake_command: ActionCommand,

    /// Optional property read for "is playing" detection
    pub playing_command: Option<PropertyCommand>,

    /// Interval between playback polls (never below [`MIN_POLL_INTERVAL`])
    pub poll_interval: Duration,

    /// Audio cue played before and after synthesized speech
    pub chime_url: Option<String>,

    /// Timeout for every outbound HTTP request
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_url: DEFAULT_DEVICE_URL.to_string(),
            provider: VoiceProvider::default(),
            tts_endpoint: None,
            voices_endpoint: None,
            default_voice: DEFAULT_VOICE.to_string(),
            speak_command: ActionCommand {
                group: 5,
                action: 1,
            },
            wake_command: ActionCommand {
                group: 5,
                action: 3,
            },
            playing_command: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            chime_url: None,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// On-disk configuration; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub device_url: Option<String>,
    pub provider: Option<VoiceProvider>,
    pub tts_endpoint: Option<String>,
    pub voices_endpoint: Option<String>,
    pub default_voice: Option<String>,
    pub speak_command: Option<String>,
    pub wake_command: Option<String>,
    pub playing_command: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub chime_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

/// Default config file location (`~/.config/beacon-speaker/config.toml` on Linux)
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "omni", "beacon-speaker")
        .map(|d| d.config_dir().join("config.toml"))
}

impl Config {
    /// Load configuration from a TOML file (if any) and the process environment
    ///
    /// An explicit `path` must exist; the default location is optional.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a value is malformed
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Self::read_file(p)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => Self::read_file(&p)?,
                None => FileConfig::default(),
            },
        };

        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Parse a TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn read_file(path: &Path) -> Result<FileConfig> {
        let content = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "loaded speaker config");
        Ok(file)
    }

    /// Merge file values with environment overrides
    ///
    /// `env` looks up a variable by name, which keeps this testable without
    /// touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if any value is malformed
    pub fn from_sources(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let pick = |key: &str, from_file: Option<String>| env(key).or(from_file);

        let provider = match env("SPEAKER_TTS_PROVIDER") {
            Some(s) => s.parse()?,
            None => file.provider.unwrap_or(defaults.provider),
        };

        let speak_command = pick("SPEAKER_SPEAK_COMMAND", file.speak_command)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(defaults.speak_command);

        let wake_command = pick("SPEAKER_WAKE_COMMAND", file.wake_command)
            .map(|s| s.parse())
            .transpose()?
            .unwrap_or(defaults.wake_command);

        let playing_command = non_empty(pick("SPEAKER_PLAYING_COMMAND", file.playing_command))
            .map(|s| s.parse())
            .transpose()?;

        let poll_interval_ms = match env("SPEAKER_POLL_INTERVAL_MS") {
            Some(s) => parse_number(&s, "SPEAKER_POLL_INTERVAL_MS")?,
            None => file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        };
        let poll_interval = Duration::from_millis(poll_interval_ms).max(MIN_POLL_INTERVAL);

        let request_timeout = match env("SPEAKER_REQUEST_TIMEOUT_SECS") {
            Some(s) => Duration::from_secs(parse_number(&s, "SPEAKER_REQUEST_TIMEOUT_SECS")?),
            None => file
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
        };

        let config = Self {
            device_url: non_empty(pick("SPEAKER_DEVICE_URL", file.device_url))
                .unwrap_or(defaults.device_url),
            provider,
            tts_endpoint: non_empty(pick("SPEAKER_TTS_ENDPOINT", file.tts_endpoint)),
            voices_endpoint: non_empty(pick("SPEAKER_VOICES_ENDPOINT", file.voices_endpoint)),
            default_voice: non_empty(pick("SPEAKER_DEFAULT_VOICE", file.default_voice))
                .unwrap_or(defaults.default_voice),
            speak_command,
            wake_command,
            playing_command,
            poll_interval,
            chime_url: non_empty(pick("SPEAKER_CHIME_URL", file.chime_url)),
            request_timeout,
        };

        if config.provider == VoiceProvider::Vendor && config.tts_endpoint.is_none() {
            tracing::warn!("vendor TTS selected but SPEAKER_TTS_ENDPOINT is unset, native voice will be used");
        }

        Ok(config)
    }
}

/// Treat blank strings as unset
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_number(value: &str, key: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} must be a number, got {value:?}")))
}

fn parse_id(value: &str, whole: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid id {value:?} in {whole:?}")))
}

fn split_ids(s: &str, expected: usize) -> Result<Vec<u32>> {
    let parts = s
        .trim()
        .split('-')
        .map(|p| parse_id(p, s))
        .collect::<Result<Vec<_>>>()?;

    if parts.len() != expected {
        return Err(Error::Config(format!(
            "expected {expected} dash-separated ids, got {s:?}"
        )));
    }

    Ok(parts)
}
