//! ==============================================================================
//! publisher.rs - best-effort push to the remote collector
//! ==============================================================================
//!
//! purpose:
//!     form-encodes the snapshot and POSTs it to the time-series endpoint
//!     (thingspeak-style `api_key` + `field1..field4`).
//!     at-most-once: no retry, no queue. a failed push is logged and dropped
//!     and never changes what the local client gets back.
//!
//! relationships:
//!     - uses: reqwest (http client)
//!     - used by: orchestrator.rs
//!
//! ==============================================================================

use std::time::Duration;

use crate::config::{InvalidSlotPolicy, TelemetryConfig};
use crate::error::NodeError;
use crate::sensors::SensorValue;
use crate::snapshot::ReadingSnapshot;

/// form field names in snapshot order
pub const FIELD_NAMES: [&str; 4] = ["field1", "field2", "field3", "field4"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPayload {
    fields: Vec<(&'static str, String)>,
}

impl PublishPayload {
    pub fn new(snapshot: &ReadingSnapshot, api_key: &str, policy: InvalidSlotPolicy) -> Self {
        let mut fields = vec![("api_key", api_key.to_string())];
        for (name, value) in FIELD_NAMES.iter().zip(snapshot.values()) {
            if let Some(text) = field_text(value, policy) {
                fields.push((*name, text));
            }
        }
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }
}

fn field_text(value: &SensorValue, policy: InvalidSlotPolicy) -> Option<String> {
    match (value.is_valid(), policy) {
        (true, _) | (false, InvalidSlotPolicy::Zero) => Some(value.format_raw()),
        (false, InvalidSlotPolicy::Omit) => None,
    }
}

#[derive(Debug, Clone)]
pub struct RemotePublisher {
    client: reqwest::Client,
    enabled: bool,
    url: String,
    api_key: String,
    policy: InvalidSlotPolicy,
}

impl RemotePublisher {
    pub fn new(config: &TelemetryConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            enabled: config.enabled,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            policy: config.invalid_slots,
        })
    }

    pub fn payload(&self, snapshot: &ReadingSnapshot) -> PublishPayload {
        PublishPayload::new(snapshot, &self.api_key, self.policy)
    }

    /// never fails from the caller's point of view
    pub async fn publish(&self, snapshot: &ReadingSnapshot) {
        if !self.enabled {
            tracing::debug!("[PUBLISH] Telemetry disabled, skipping");
            return;
        }
        match self.try_publish(snapshot).await {
            Ok(status) => tracing::info!("[PUBLISH] Data sent to collector: {}", status),
            Err(e) => tracing::warn!("[PUBLISH] ⚠ {}", e),
        }
    }

    pub async fn try_publish(&self, snapshot: &ReadingSnapshot) -> Result<u16, NodeError> {
        let payload = self.payload(snapshot);
        let response = self
            .client
            .post(&self.url)
            .form(payload.fields())
            .send()
            .await
            .map_err(|e| NodeError::Network(format!("POST {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::Network(format!("collector answered {}", status)));
        }
        Ok(status.as_u16())
    }
}
