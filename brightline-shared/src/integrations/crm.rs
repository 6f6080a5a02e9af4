/// CRM collaborator
///
/// Form submissions become leads in the CRM and registered users become
/// contacts. The CRM's identifier for the record is returned so it can be
/// stored next to the local row.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

/// Error type for CRM synchronization
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM request failed: {0}")]
    Request(String),

    #[error("CRM rejected the record with status {status}")]
    Rejected { status: u16 },

    #[error("Invalid CRM response: {0}")]
    InvalidResponse(String),
}

/// Lead created from a form submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrmLead {
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    /// Form type the lead came from (`contact`, `quote`, `demo`)
    pub source: String,
    /// Remaining form fields
    pub details: JsonValue,
}

/// Contact created from a user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrmContact {
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
}

/// Pushes leads and contacts to a CRM
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Creates a lead; returns the CRM's id for it when the CRM assigns one
    async fn create_lead(&self, lead: &CrmLead) -> Result<Option<String>, CrmError>;

    /// Creates or updates a contact keyed by email; returns the CRM's id
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<Option<String>, CrmError>;
}

/// CRM client used when no CRM is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCrmClient;

#[async_trait]
impl CrmClient for NoopCrmClient {
    async fn create_lead(&self, lead: &CrmLead) -> Result<Option<String>, CrmError> {
        debug!(source = %lead.source, "CRM disabled, skipping lead");
        Ok(None)
    }

    async fn upsert_contact(&self, _contact: &CrmContact) -> Result<Option<String>, CrmError> {
        debug!("CRM disabled, skipping contact");
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: Option<String>,
}

/// CRM reached over a JSON HTTP API
///
/// - `POST {base_url}/leads` with a [`CrmLead`] body
/// - `PUT {base_url}/contacts` with a [`CrmContact`] body
///
/// Both answer `{"id": "..."}`.
#[derive(Debug, Clone)]
pub struct HttpCrmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpCrmClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Option<String>, CrmError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| CrmError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CrmError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let record: CreatedRecord = response
            .json()
            .await
            .map_err(|e| CrmError::InvalidResponse(e.to_string()))?;

        Ok(record.id)
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn create_lead(&self, lead: &CrmLead) -> Result<Option<String>, CrmError> {
        let request = self.client.post(format!("{}/leads", self.base_url)).json(lead);
        self.send(request).await
    }

    async fn upsert_contact(&self, contact: &CrmContact) -> Result<Option<String>, CrmError> {
        let request = self.client.put(format!("{}/contacts", self.base_url)).json(contact);
        self.send(request).await
    }
}
