//! Vehicle log and traffic flow client
//!
//! Vehicle logs are paged with `{items, total, limit, offset}`; the
//! traffic flow view returns the same page geometry but nests its rows
//! under `data` with a dwell-time cutoff applied server side.

use crate::console_api::{build_http_client, check_response, with_bearer, DEFAULT_TIMEOUT_SECS};
use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleLog {
    pub id: i64,
    pub plate_text: String,
    pub entry_time: Option<String>,
    pub exit_time: Option<String>,
    pub dwell_time: Option<String>,
    pub dwell_seconds: Option<i64>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub capture_image: Option<String>,
    pub camera_name: Option<String>,
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    pub object_classification: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleLogPage {
    pub items: Vec<VehicleLog>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrafficFlowPage {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub date: String,
    pub dwell_limit_seconds: i64,
    pub data: Vec<VehicleLog>,
}

/// Query parameters for the vehicle log list
#[derive(Debug, Clone, Default)]
pub struct VehicleLogQuery {
    pub search: Option<String>,
    /// YYYY-MM-DD; a single bound is treated as a same-day range
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// VehicleClient instance
pub struct VehicleClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl VehicleClient {
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

    /// Paged vehicle log list
    pub async fn list_logs(&self, query: &VehicleLogQuery) -> Result<VehicleLogPage> {
        let url = format!("{}/api/vehicle-logs/", self.base_url);
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }
        if let Some(date_from) = &query.date_from {
            params.push(("date_from", date_from.clone()));
        }
        if let Some(date_to) = &query.date_to {
            params.push(("date_to", date_to.clone()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = query.offset {
            params.push(("offset", offset.to_string()));
        }

        let request = with_bearer(self.client.get(&url), self.token.as_deref()).query(&params);
        let response = request.send().await?;
        let page: VehicleLogPage = check_response(response).await?.json().await?;

        tracing::debug!(
            items = page.items.len(),
            total = page.total,
            "Fetched vehicle logs"
        );
        Ok(page)
    }

    /// Traffic flow rows for one day, capped by dwell limit
    pub async fn traffic_flow(
        &self,
        date: Option<&str>,
        limit: u32,
        offset: u32,
        dwell_limit_seconds: u32,
    ) -> Result<TrafficFlowPage> {
        let url = format!("{}/api/traffic-flow/vehicles", self.base_url);
        let mut params = vec![
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
            ("dwell_limit_seconds", dwell_limit_seconds.to_string()),
        ];
        if let Some(date) = date {
            params.push(("date", date.to_string()));
        }

        let request = with_bearer(self.client.get(&url), self.token.as_deref()).query(&params);
        let response = request.send().await?;
        Ok(check_response(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_page_deserializes_with_type_alias() {
        let payload = serde_json::json!({
            "items": [{
                "id": 3,
                "plate_text": "KA01AB1234",
                "entry_time": "2026-08-01 09:00:00",
                "exit_time": null,
                "dwell_time": null,
                "dwell_seconds": null,
                "location": "Gate 1",
                "status": "inside",
                "capture_image": null,
                "camera_name": "gate-cam",
                "type": "entry",
                "object_classification": "car"
            }],
            "total": 1,
            "limit": 200,
            "offset": 0
        });
        let page: VehicleLogPage = serde_json::from_value(payload).unwrap();
        assert_eq!(page.items[0].event_type.as_deref(), Some("entry"));
        assert!(page.items[0].exit_time.is_none());
    }

    #[test]
    fn test_traffic_flow_page_deserializes() {
        let payload = serde_json::json!({
            "total": 0,
            "limit": 20,
            "offset": 0,
            "date": "2026-08-27",
            "dwell_limit_seconds": 7200,
            "data": []
        });
        let page: TrafficFlowPage = serde_json::from_value(payload).unwrap();
        assert_eq!(page.dwell_limit_seconds, 7200);
        assert!(page.data.is_empty());
    }
}
