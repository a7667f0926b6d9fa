//! Push delivery: payloads, the transport seam and the fan-out dispatcher.

mod dispatcher;
mod http;

pub use dispatcher::PushDispatcher;
pub use http::HttpPushTransport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PushSubscription;

/// Delivery credentials and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PushConfig {
    /// Gateway credential; without it the dispatcher runs in no-op mode
    pub api_key: Option<String>,
    /// Contact URI sent with every delivery (e.g. "mailto:admin@example.org")
    pub subject: Option<String>,
    /// How long the push service may hold an undelivered message
    pub ttl_secs: u32,
    /// Upper bound for one delivery attempt
    pub timeout_secs: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            subject: None,
            ttl_secs: 86_400,
            timeout_secs: 10,
        }
    }
}

impl PushConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

/// What a device shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    /// Page to open when the notification is tapped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Devices replace an earlier notification with the same tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl PushPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            url: None,
            tag: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// A failed delivery, rendered for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Why one subscription did not receive a payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The push service no longer knows the subscription (404/410)
    #[error("subscription gone (HTTP {status})")]
    Gone { status: u16 },

    #[error("push service rejected delivery (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("delivery timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

impl DeliveryError {
    /// Permanent failures prune the subscription; everything else keeps it
    /// for the next attempt.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Gone { .. })
    }

    pub fn detail(&self) -> ErrorDetail {
        let code = match self {
            DeliveryError::Gone { status } | DeliveryError::Rejected { status, .. } => {
                format!("http_{}", status)
            }
            DeliveryError::Timeout => "timeout".to_string(),
            DeliveryError::Network(_) => "network".to_string(),
        };
        ErrorDetail::new(code, self.to_string())
    }
}

/// Delivers one payload to one device.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError>;
}

/// Aggregate outcome of a dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Subscriptions deleted after a permanent failure
    pub pruned: usize,
    /// `false` when no delivery credentials are configured; nothing was attempted
    pub configured: bool,
    pub errors: Vec<ErrorDetail>,
}

impl DispatchReport {
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn configured() -> Self {
        Self {
            configured: true,
            ..Default::default()
        }
    }

    pub fn record_failure(&mut self, detail: ErrorDetail) {
        self.failed += 1;
        self.errors.push(detail);
    }

    /// Adds another report's counts and errors to this one.
    pub fn absorb(&mut self, other: DispatchReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.pruned += other.pruned;
        self.configured |= other.configured;
        self.errors.extend(other.errors);
    }
}
