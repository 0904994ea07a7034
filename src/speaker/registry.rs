//! Vendor TTS voice selection
//!
//! Voices are switched by display name or provider id against a remote
//! catalog. The catalog is fetched lazily and kept for the process lifetime
//! once a non-empty list has loaded.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Error, Result};

/// One voice offered by the TTS vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCatalogEntry {
    /// Display name, e.g. `Maomao`
    pub name: String,
    /// Provider voice id, e.g. `zh_female_maomao_x`
    pub speaker: String,
}

/// Source of the vendor voice list
#[async_trait]
pub trait VoiceCatalog: Send + Sync {
    /// Fetch every available voice
    async fn fetch(&self) -> Result<Vec<VoiceCatalogEntry>>;
}

/// Voice catalog served as a JSON array over HTTP
#[derive(Debug, Clone)]
pub struct HttpVoiceCatalog {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpVoiceCatalog {
    /// Create a catalog client for `endpoint`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl VoiceCatalog for HttpVoiceCatalog {
    async fn fetch(&self) -> Result<Vec<VoiceCatalogEntry>> {
        let response = self.client.get(&self.endpoint).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Catalog(format!("voice list error {status}: {body}")));
        }

        let body: serde_json::Value = response.json().await?;
        parse_catalog(body)
    }
}

/// Validate a catalog response body
///
/// # Errors
///
/// Returns error unless `body` is an array of `{name, speaker}` objects
pub fn parse_catalog(body: serde_json::Value) -> Result<Vec<VoiceCatalogEntry>> {
    if !body.is_array() {
        return Err(Error::Catalog("voice list is not an array".to_string()));
    }

    serde_json::from_value(body).map_err(|e| Error::Catalog(format!("malformed voice list: {e}")))
}

#[derive(Debug, Default)]
enum CatalogCache {
    #[default]
    Empty,
    Loaded(Vec<VoiceCatalogEntry>),
    FetchFailed,
}

/// Tracks the active vendor voice
pub struct SpeakerRegistry {
    catalog: Option<Arc<dyn VoiceCatalog>>,
    cache: Mutex<CatalogCache>,
    active: RwLock<String>,
}

impl SpeakerRegistry {
    /// Create a registry starting on `default_voice`
    ///
    /// Without a catalog, voices cannot be switched.
    #[must_use]
    pub fn new(default_voice: impl Into<String>, catalog: Option<Arc<dyn VoiceCatalog>>) -> Self {
        Self {
            catalog,
            cache: Mutex::new(CatalogCache::Empty),
            active: RwLock::new(default_voice.into()),
        }
    }

    /// Voice id used when a request names none
    #[must_use]
    pub fn active_voice(&self) -> String {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All known voices, fetching the catalog if needed
    ///
    /// Returns `None` when the catalog is unavailable.
    pub async fn voices(&self) -> Option<Vec<VoiceCatalogEntry>> {
        let catalog = self.catalog.as_ref()?;
        let mut cache = self.cache.lock().await;

        match &*cache {
            CatalogCache::Loaded(entries) if !entries.is_empty() => return Some(entries.clone()),
            CatalogCache::FetchFailed => {
                tracing::debug!("retrying voice catalog after earlier failure");
            }
            CatalogCache::Empty | CatalogCache::Loaded(_) => {}
        }

        match catalog.fetch().await {
            Ok(entries) => {
                tracing::debug!(voices = entries.len(), "loaded voice catalog");
                *cache = CatalogCache::Loaded(entries.clone());
                Some(entries)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch voice catalog");
                *cache = CatalogCache::FetchFailed;
                None
            }
        }
    }

    /// Make the voice matching `name_or_id` the default
    ///
    /// Matches exactly on display name or provider id. Returns false, leaving
    /// the current voice untouched, when there is no match or no catalog.
    pub async fn switch_default_voice(&self, name_or_id: &str) -> bool {
        let Some(voices) = self.voices().await else {
            return false;
        };

        let Some(entry) = voices
            .iter()
            .find(|v| v.name == name_or_id || v.speaker == name_or_id)
        else {
            tracing::info!(voice = name_or_id, "no such voice");
            return false;
        };

        self.active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(&entry.speaker);
        tracing::info!(name = %entry.name, speaker = %entry.speaker, "switched default voice");
        true
    }
}
