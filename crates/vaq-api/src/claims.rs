//! # Admin Claims
//!
//! Sets the `admin` custom claim on a Firebase Auth user through the Identity
//! Toolkit REST API. Used by the `vaq-admin` binary.

use crate::google::GoogleAuth;
use anyhow::{anyhow, Context};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

/// The parts of an Auth user record the CLI prints
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub custom_attributes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AuthUser>,
}

/// Identity Toolkit client scoped to one Firebase project
pub struct AdminClaims {
    client: Client,
    base_url: String,
    project_id: String,
    auth: GoogleAuth,
}

impl AdminClaims {
    pub fn new(project_id: impl Into<String>, auth: GoogleAuth) -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            auth,
        }
    }

    /// Builder: set custom API base URL (emulator or tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts:{}",
            self.base_url.trim_end_matches('/'),
            self.project_id,
            action
        )
    }

    /// Replace the user's custom claims with `{"admin": value}` and return the user
    pub async fn set_admin(&self, uid: &str, value: bool) -> anyhow::Result<AuthUser> {
        let token = self.auth.access_token(&self.client).await?;

        let claims = serde_json::to_string(&json!({ "admin": value }))?;
        self.client
            .post(self.endpoint("update"))
            .bearer_auth(&token)
            .json(&json!({ "localId": uid, "customAttributes": claims }))
            .send()
            .await
            .context("Identity Toolkit unreachable")?
            .error_for_status()
            .context("Failed to set custom claims")?;

        debug!("Custom claims updated for {}", uid);

        let lookup: LookupResponse = self
            .client
            .post(self.endpoint("lookup"))
            .bearer_auth(&token)
            .json(&json!({ "localId": [uid] }))
            .send()
            .await
            .context("Identity Toolkit unreachable")?
            .error_for_status()
            .context("Failed to look up user")?
            .json()
            .await
            .context("Invalid lookup response")?;

        lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("User not found: {}", uid))
    }
}

/// Line printed after a successful update
pub fn summary(user: &AuthUser, value: bool) -> String {
    format!(
        "Admin claim set to {} for {} ({})",
        value,
        user.local_id,
        user.email.as_deref().unwrap_or("no-email")
    )
}
