//! Webhook-based alert delivery.

use std::time::Duration;

use async_trait::async_trait;
use pingwatch_monitor::{Notifier, NotifyError};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Default request timeout.
pub const DEFAULT_WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts alerts as JSON to an HTTP endpoint.
///
/// ```json
/// {"recipient": "ops@example.com", "subject": "Internet is down", "body": "..."}
/// ```
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    recipient: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let payload = AlertPayload {
            recipient,
            subject,
            body,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(format!(
                "webhook returned status {}",
                status
            )));
        }

        debug!("webhook {} accepted alert with {}", self.url, status);
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::Transport(format!("request timed out: {}", err))
    } else if err.is_connect() {
        NotifyError::Transport(format!("connection failed: {}", err))
    } else {
        NotifyError::Transport(err.to_string())
    }
}
