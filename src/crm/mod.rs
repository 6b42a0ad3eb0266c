use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("crm endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The lead fields pushed to the CRM on sync.
#[derive(Debug, Clone)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub title: Option<String>,
    pub company: Option<String>,
}

#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn sync_contact(&self, contact: &ContactFields) -> Result<(), CrmError>;
}

/// HubSpot contacts client. One attempt per call, no retry.
pub struct HubspotClient {
    client: reqwest::Client,
    api_token: String,
    base_url: String,
}

impl HubspotClient {
    pub fn new(api_token: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_token,
            base_url: base_url.unwrap_or_else(|| "https://api.hubapi.com".to_string()),
        }
    }
}

#[async_trait]
impl CrmClient for HubspotClient {
    async fn sync_contact(&self, contact: &ContactFields) -> Result<(), CrmError> {
        let mut parts = contact.name.splitn(2, ' ');
        let firstname = parts.next().unwrap_or_default();
        let lastname = parts.next();

        let mut properties = json!({
            "email": contact.email,
            "firstname": firstname,
        });
        if let Some(lastname) = lastname {
            properties["lastname"] = json!(lastname);
        }
        if let Some(title) = &contact.title {
            properties["jobtitle"] = json!(title);
        }
        if let Some(company) = &contact.company {
            properties["company"] = json!(company);
        }

        let response = self
            .client
            .post(format!("{}/crm/v3/objects/contacts", self.base_url))
            .bearer_auth(&self.api_token)
            .json(&json!({ "properties": properties }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrmError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
