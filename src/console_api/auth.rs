//! Operator authentication client
//!
//! Register/login against the console backend. Login hands back a bearer
//! token plus the operator profile; the token is what the other console
//! clients attach to their requests.

use crate::console_api::{build_http_client, check_response, DEFAULT_TIMEOUT_SECS};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperatorProfile {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: OperatorProfile,
}

/// AuthClient instance
pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Register a new operator account
    pub async fn register(&self, req: &RegisterRequest) -> Result<OperatorProfile> {
        let url = format!("{}/api/auth/register", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;
        let profile: OperatorProfile = check_response(response).await?.json().await?;

        tracing::info!(email = %profile.email, "Operator registered");
        Ok(profile)
    }

    /// Log in and obtain a bearer token
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        let url = format!("{}/api/auth/login", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;
        let login: LoginResponse = check_response(response).await?.json().await?;

        tracing::info!(
            email = %login.user.email,
            role = %login.user.role,
            "Operator logged in"
        );
        Ok(login)
    }
}
