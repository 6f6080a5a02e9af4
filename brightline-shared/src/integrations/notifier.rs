/// Staff notification collaborator
///
/// After a form submission is stored, staff are told about it by email. The
/// delivery service is reached over a JSON HTTP API; [`NoopNotifier`] stands
/// in when no API is configured.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

/// Error type for notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(String),

    #[error("Notification rejected with status {status}")]
    Rejected { status: u16 },
}

/// Message sent to staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Address replies should go to (the submitter)
    pub reply_to: Option<String>,
}

/// Delivers staff notifications
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that drops every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        debug!(subject = %notification.subject, "Email notifications disabled, skipping");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Email delivery over an HTTP API
///
/// Posts `{from, to, subject, text, reply_to}` to `api_url` with the API key
/// as a bearer token. Any 2xx answer counts as delivered.
#[derive(Debug, Clone)]
pub struct HttpEmailNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
    to: String,
}

impl HttpEmailNotifier {
    pub fn new(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_key,
            from: from.into(),
            to: to.into(),
        }
    }
}

#[async_trait]
impl Notifier for HttpEmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = SendEmailRequest {
            from: &self.from,
            to: &self.to,
            subject: &notification.subject,
            text: &notification.body,
            reply_to: notification.reply_to.as_deref(),
        };

        let mut request = self.client.post(&self.api_url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected {
                status: response.status().as_u16(),
            });
        }

        Ok(())
    }
}
