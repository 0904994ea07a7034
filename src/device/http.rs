//! Device bridge client
//!
//! Talks JSON over HTTP to a bridge service that owns the authenticated
//! speaker session.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Device, DeviceStatus, PlayArgs};
use crate::config::ActionCommand;
use crate::{Error, Result};

/// Device reached through the HTTP bridge
#[derive(Debug, Clone)]
pub struct HttpDevice {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    group: u32,
    action: u32,
    args: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PropertyResponse {
    #[serde(default)]
    value: serde_json::Value,
}

impl HttpDevice {
    /// Create a bridge client without contacting the bridge
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Init(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a bridge client and verify the device answers
    ///
    /// # Errors
    ///
    /// Returns [`Error::Init`] if the bridge or device is unreachable
    pub async fn connect(base_url: &str, timeout: Duration) -> Result<Self> {
        let device = Self::new(base_url, timeout)?;

        let status = device.status().await.map_err(|e| {
            Error::Init(format!("device bridge at {} unavailable: {e}", device.base_url))
        })?;

        tracing::debug!(
            url = %device.base_url,
            status = %status.status,
            "connected to device bridge"
        );

        Ok(device)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Fail on non-2xx responses, keeping the body for the error message
    async fn ensure_success(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Device(format!("{path} failed with {status}: {body}")))
    }
}

#[async_trait]
impl Device for HttpDevice {
    async fn do_action(&self, command: ActionCommand, args: &[String]) -> Result<()> {
        let request = ActionRequest {
            group: command.group,
            action: command.action,
            args,
        };

        tracing::trace!(group = command.group, action = command.action, ?args, "device action");

        let response = self
            .client
            .post(self.url("action"))
            .json(&request)
            .send()
            .await?;
        Self::ensure_success("action", response).await?;
        Ok(())
    }

    async fn get_property(&self, group: u32, property: u32) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(self.url("property"))
            .query(&[("group", group), ("property", property)])
            .send()
            .await?;
        let body: PropertyResponse = Self::ensure_success("property", response)
            .await?
            .json()
            .await?;
        Ok(body.value)
    }

    async fn play(&self, args: PlayArgs) -> Result<()> {
        tracing::trace!(?args, "device play");

        let response = self
            .client
            .post(self.url("play"))
            .json(&args)
            .send()
            .await?;
        Self::ensure_success("play", response).await?;
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let response = self.client.post(self.url("pause")).send().await?;
        Self::ensure_success("pause", response).await?;
        Ok(())
    }

    async fn status(&self) -> Result<DeviceStatus> {
        let response = self.client.get(self.url("status")).send().await?;
        let status = Self::ensure_success("status", response)
            .await?
            .json()
            .await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let device = HttpDevice::new("http://bridge:8087/", Duration::from_secs(1)).unwrap();
        assert_eq!(device.url("status"), "http://bridge:8087/status");
    }

    #[test]
    fn action_request_shape() {
        let args = vec!["hello".to_string()];
        let request = ActionRequest {
            group: 5,
            action: 1,
            args: &args,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "group": 5, "action": 1, "args": ["hello"] })
        );
    }

    #[test]
    fn property_response_defaults_to_null() {
        let body: PropertyResponse = serde_json::from_str("{}").unwrap();
        assert!(body.value.is_null());
    }
}
