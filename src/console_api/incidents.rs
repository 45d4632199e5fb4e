//! Incident alert client
//!
//! Lists, filters and resolves incident alerts (crowd and unauthorized
//! entry). The list defaults to active alerts only, matching what the
//! operator console shows on its alerts board.

use crate::console_api::{build_http_client, check_response, with_bearer, DEFAULT_TIMEOUT_SECS};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Crowd,
    Unauthorized,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentAlert {
    pub alert_id: i64,
    pub incident_type: IncidentType,
    pub zone_name: String,
    pub camera_name: String,
    pub person_count: Option<i64>,
    pub max_count: Option<i64>,
    pub timestamp: DateTime<Utc>,
    pub image_base64: String,
    pub message: String,
}

/// Filter values the backend has seen, for populating dropdowns
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentFilters {
    #[serde(default)]
    pub camera_names: Vec<String>,
    #[serde(default)]
    pub object_types: Vec<String>,
}

/// Query parameters for the alert list
#[derive(Debug, Clone)]
pub struct AlertQuery {
    /// "all", "crowd" or "unauthorized"
    pub incident_type: String,
    /// "active", "resolved" or "all"
    pub status: String,
    pub camera_name: Option<String>,
    pub object_type: Option<String>,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            incident_type: "all".to_string(),
            status: "active".to_string(),
            camera_name: None,
            object_type: None,
        }
    }
}

/// IncidentClient instance
pub struct IncidentClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl IncidentClient {
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

    /// List alerts matching the query
    pub async fn list_alerts(&self, query: &AlertQuery) -> Result<Vec<IncidentAlert>> {
        let url = format!("{}/api/incidents/alerts", self.base_url);
        let mut params = vec![
            ("incident_type", query.incident_type.clone()),
            ("status", query.status.clone()),
        ];
        if let Some(camera_name) = &query.camera_name {
            params.push(("camera_name", camera_name.clone()));
        }
        if let Some(object_type) = &query.object_type {
            params.push(("object_type", object_type.clone()));
        }

        let request = with_bearer(self.client.get(&url), self.token.as_deref()).query(&params);
        let response = request.send().await?;
        let alerts: Vec<IncidentAlert> = check_response(response).await?.json().await?;

        tracing::debug!(
            count = alerts.len(),
            status = %query.status,
            "Fetched incident alerts"
        );
        Ok(alerts)
    }

    /// Distinct camera names and object types seen in alerts
    pub async fn filters(&self) -> Result<IncidentFilters> {
        let url = format!("{}/api/incidents/alerts/filters", self.base_url);
        let request = with_bearer(self.client.get(&url), self.token.as_deref());
        let response = request.send().await?;
        Ok(check_response(response).await?.json().await?)
    }

    /// Mark one alert resolved
    pub async fn resolve_alert(&self, alert_id: i64) -> Result<IncidentAlert> {
        let url = format!(
            "{}/api/incidents/alerts/{}/resolve",
            self.base_url, alert_id
        );
        let request = with_bearer(self.client.put(&url), self.token.as_deref());
        let response = request.send().await?;
        let alert: IncidentAlert = check_response(response).await?.json().await?;

        tracing::info!(alert_id = alert_id, "Incident alert resolved");
        Ok(alert)
    }
}
