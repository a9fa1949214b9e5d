//! # Google Access Tokens
//!
//! OAuth access tokens for Firestore and Identity Toolkit calls. A token from
//! the environment wins; otherwise the metadata server of the hosting runtime
//! is asked for one on every call.

use reqwest::Client;
use serde::Deserialize;
use vaq_core::{PaymentError, PaymentResult};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Source of bearer tokens for Google APIs
#[derive(Clone, PartialEq, Eq)]
pub enum GoogleAuth {
    /// Fixed token (e.g. `gcloud auth print-access-token`)
    Static(String),
    /// Runtime metadata server
    Metadata { url: String },
}

impl std::fmt::Debug for GoogleAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoogleAuth::Static(_) => f.write_str("GoogleAuth::Static(<redacted>)"),
            GoogleAuth::Metadata { url } => write!(f, "GoogleAuth::Metadata({})", url),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl GoogleAuth {
    /// `FIREBASE_ACCESS_TOKEN` if set, the metadata server otherwise
    pub fn from_env() -> Self {
        match std::env::var("FIREBASE_ACCESS_TOKEN") {
            Ok(token) if !token.is_empty() => GoogleAuth::Static(token),
            _ => GoogleAuth::metadata(),
        }
    }

    pub fn metadata() -> Self {
        GoogleAuth::Metadata {
            url: METADATA_TOKEN_URL.to_string(),
        }
    }

    /// Fetch a bearer token
    pub async fn access_token(&self, client: &Client) -> PaymentResult<String> {
        match self {
            GoogleAuth::Static(token) => Ok(token.clone()),
            GoogleAuth::Metadata { url } => {
                let response = client
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(|e| {
                        PaymentError::Configuration(format!("Metadata server unreachable: {}", e))
                    })?;

                if !response.status().is_success() {
                    return Err(PaymentError::Configuration(format!(
                        "Metadata server returned HTTP {}",
                        response.status()
                    )));
                }

                let token: MetadataToken = response.json().await.map_err(|e| {
                    PaymentError::Serialization(format!("Invalid metadata token: {}", e))
                })?;
                Ok(token.access_token)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_static_token() {
        let auth = GoogleAuth::Static("ya29.token".into());
        assert_eq!(auth.access_token(&Client::new()).await.unwrap(), "ya29.token");
        assert!(!format!("{:?}", auth).contains("ya29"));
    }

    #[tokio::test]
    async fn test_metadata_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.meta",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let auth = GoogleAuth::Metadata {
            url: format!("{}/token", server.uri()),
        };
        assert_eq!(auth.access_token(&Client::new()).await.unwrap(), "ya29.meta");
    }
}
