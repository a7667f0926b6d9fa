use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration;

use super::{DeliveryError, PushConfig, PushPayload, PushTransport};
use crate::error::CoreError;
use crate::models::PushSubscription;

/// Posts payloads to each subscription's endpoint through a push gateway.
///
/// The gateway receives the payload together with the subscription's
/// `p256dh`/`auth` keys and takes care of message encryption.
pub struct HttpPushTransport {
    /// Shared HTTP client.
    client: reqwest::Client,
    api_key: String,
    subject: Option<String>,
    ttl_secs: u32,
}

impl HttpPushTransport {
    /// Builds a transport from configuration; fails when no `api_key` is set.
    pub fn new(config: &PushConfig) -> Result<Self, CoreError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CoreError::Delivery("push api_key is not configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| CoreError::Delivery(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            subject: config.subject.clone(),
            ttl_secs: config.ttl_secs,
        })
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), DeliveryError> {
        let body = json!({
            "keys": {
                "p256dh": subscription.p256dh,
                "auth": subscription.auth,
            },
            "payload": payload,
        });

        let mut request = self
            .client
            .post(&subscription.endpoint)
            .bearer_auth(&self.api_key)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", "normal")
            .json(&body);
        if let Some(subject) = &self.subject {
            request = request.header("From", subject);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(DeliveryError::Timeout),
            Err(e) => return Err(DeliveryError::Network(e.to_string())),
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(DeliveryError::Gone { status: status.as_u16() });
        }

        let message = response.text().await.unwrap_or_default();
        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            message
        };
        Err(DeliveryError::Rejected { status: status.as_u16(), message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> PushConfig {
        PushConfig {
            api_key: Some("secret".to_string()),
            subject: Some("mailto:admin@example.org".to_string()),
            ttl_secs: 60,
            timeout_secs: 1,
        }
    }

    fn subscription(endpoint: String) -> PushSubscription {
        PushSubscription {
            id: Uuid::now_v7(),
            member_id: Uuid::now_v7(),
            endpoint,
            p256dh: "p256dh-key".to_string(),
            auth: "auth-secret".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            HttpPushTransport::new(&PushConfig::default()),
            Err(CoreError::Delivery(_))
        ));
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/push/abc"))
            .and(header("authorization", "Bearer secret"))
            .and(header("ttl", "60"))
            .and(header("from", "mailto:admin@example.org"))
            .and(body_partial_json(json!({
                "keys": { "p256dh": "p256dh-key", "auth": "auth-secret" },
                "payload": { "title": "Chores", "body": "1 task due" },
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpPushTransport::new(&config()).unwrap();
        let result = transport
            .send(&subscription(format!("{}/push/abc", server.uri())), &PushPayload::new("Chores", "1 task due"))
            .await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_send_maps_gone_statuses() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpPushTransport::new(&config()).unwrap();
        let payload = PushPayload::new("Chores", "1 task due");

        let gone = transport.send(&subscription(format!("{}/gone", server.uri())), &payload).await;
        assert_eq!(gone, Err(DeliveryError::Gone { status: 410 }));

        let missing = transport.send(&subscription(format!("{}/missing", server.uri())), &payload).await;
        assert_eq!(missing, Err(DeliveryError::Gone { status: 404 }));
    }

    #[tokio::test]
    async fn test_send_reports_rejections_with_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let transport = HttpPushTransport::new(&config()).unwrap();
        let result = transport
            .send(&subscription(format!("{}/push", server.uri())), &PushPayload::new("Chores", "x"))
            .await;
        assert_eq!(
            result,
            Err(DeliveryError::Rejected { status: 429, message: "slow down".to_string() })
        );
    }

    #[tokio::test]
    async fn test_send_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let transport = HttpPushTransport::new(&config()).unwrap();
        let result = transport
            .send(&subscription(format!("{}/slow", server.uri())), &PushPayload::new("Chores", "x"))
            .await;
        assert_eq!(result, Err(DeliveryError::Timeout));
    }

    #[tokio::test]
    async fn test_send_network_error() {
        let transport = HttpPushTransport::new(&config()).unwrap();
        let result = transport
            .send(&subscription("http://127.0.0.1:9/unreachable".to_string()), &PushPayload::new("Chores", "x"))
            .await;
        assert!(matches!(result, Err(DeliveryError::Network(_)) | Err(DeliveryError::Timeout)));
    }
}
