//! Vehicle whitelist client
//!
//! CRUD for approved-vehicle entries plus the quick status flip the
//! console uses to approve or revoke a vehicle without a full edit.

use crate::console_api::{build_http_client, check_response, with_bearer, DEFAULT_TIMEOUT_SECS};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct WhitelistCreate {
    pub name: String,
    pub vehicle_number: String,
    pub vehicle_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WhitelistUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistEntry {
    pub id: i64,
    pub name: String,
    pub vehicle_number: String,
    pub vehicle_type: String,
    pub purpose: Option<String>,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

const VALID_STATUSES: [&str; 2] = ["approved", "rejected"];

/// WhitelistClient instance
pub struct WhitelistClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl WhitelistClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub async fn list(&self) -> Result<Vec<WhitelistEntry>> {
        let url = format!("{}/api/vehicle-whitelist/", self.base_url);
        let request = with_bearer(self.client.get(&url), self.token.as_deref());
        let response = request.send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    pub async fn create(&self, req: &WhitelistCreate) -> Result<WhitelistEntry> {
        let url = format!("{}/api/vehicle-whitelist/", self.base_url);
        let request = with_bearer(self.client.post(&url), self.token.as_deref()).json(req);
        let response = request.send().await?;
        let entry: WhitelistEntry = check_response(response).await?.json().await?;

        tracing::info!(
            vehicle_number = %entry.vehicle_number,
            "Whitelist entry created"
        );
        Ok(entry)
    }

    pub async fn update(&self, id: i64, req: &WhitelistUpdate) -> Result<WhitelistEntry> {
        let url = format!("{}/api/vehicle-whitelist/{}", self.base_url, id);
        let request = with_bearer(self.client.put(&url), self.token.as_deref()).json(req);
        let response = request.send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    /// Flip an entry between "approved" and "rejected"
    pub async fn set_status(&self, id: i64, status: &str) -> Result<WhitelistEntry> {
        if !VALID_STATUSES.contains(&status) {
            return Err(Error::Validation(format!(
                "Status must be one of {:?}, got '{}'",
                VALID_STATUSES, status
            )));
        }

        let url = format!("{}/api/vehicle-whitelist/{}/status/{}", self.base_url, id, status);
        let request = with_bearer(self.client.put(&url), self.token.as_deref());
        let response = request.send().await?;
        let entry: WhitelistEntry = check_response(response).await?.json().await?;

        tracing::info!(
            vehicle_number = %entry.vehicle_number,
            status = %status,
            "Whitelist status changed"
        );
        Ok(entry)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let url = format!("{}/api/vehicle-whitelist/{}", self.base_url, id);
        let request = with_bearer(self.client.delete(&url), self.token.as_deref());
        let response = request.send().await?;
        check_response(response).await?;
        Ok(())
    }
}
