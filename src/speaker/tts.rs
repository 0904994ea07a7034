//! Vendor text-to-speech URLs
//!
//! The vendor endpoint renders audio on request, so the device is simply
//! handed a URL carrying the voice and the escaped text.

use crate::{Error, Result};

/// Builds playable URLs for a vendor TTS endpoint
#[derive(Debug, Clone)]
pub struct VendorTts {
    endpoint: String,
}

impl VendorTts {
    /// Create a URL builder for `endpoint`
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an http(s) URL
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::Config(format!(
                "TTS endpoint must be an http(s) URL, got {endpoint:?}"
            )));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// URL that renders `text` with voice `speaker`
    #[must_use]
    pub fn speech_url(&self, text: &str, speaker: &str) -> String {
        let separator = if self.endpoint.contains('?') {
            if self.endpoint.ends_with('?') || self.endpoint.ends_with('&') {
                ""
            } else {
                "&"
            }
        } else {
            "?"
        };

        format!(
            "{}{separator}speaker={}&text={}",
            self.endpoint,
            urlencoding::encode(speaker),
            urlencoding::encode(text)
        )
    }
}
