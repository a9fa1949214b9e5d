//! # ePayco Configuration
//!
//! Configuration management for the ePayco integration.
//! All secrets are loaded from environment variables.

use std::env;
use std::fmt;
use tracing::warn;
use vaq_core::{PaymentError, PaymentResult};

const DEFAULT_API_BASE_URL: &str = "https://api.secure.payco.co";

/// The four account secrets issued by ePayco
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EpaycoCredentials {
    /// Public API key (also handed to the checkout widget)
    pub public_key: String,
    /// Private API key
    pub private_key: String,
    /// Merchant customer id (`p_cust_id_cliente`)
    pub customer_id: String,
    /// Signing key (`p_key`)
    pub p_key: String,
}

impl EpaycoCredentials {
    pub fn new(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        customer_id: impl Into<String>,
        p_key: impl Into<String>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
            customer_id: customer_id.into(),
            p_key: p_key.into(),
        }
    }

    /// Names of the secrets that are empty
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("EPAYCO_PUBLIC_KEY", &self.public_key),
            ("EPAYCO_PRIVATE_KEY", &self.private_key),
            ("EPAYCO_CUSTOMER_ID", &self.customer_id),
            ("EPAYCO_P_KEY", &self.p_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// Fail with a configuration error unless all four secrets are set
    pub fn ensure_complete(&self) -> PaymentResult<()> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::Configuration(format!(
                "Missing ePayco configuration secrets: {}",
                missing.join(", ")
            )))
        }
    }
}

impl fmt::Debug for EpaycoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpaycoCredentials")
            .field("public_key", &self.public_key)
            .field("private_key", &redact(&self.private_key))
            .field("customer_id", &self.customer_id)
            .field("p_key", &redact(&self.p_key))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

/// ePayco API configuration
#[derive(Debug, Clone)]
pub struct EpaycoConfig {
    pub credentials: EpaycoCredentials,

    /// API base URL (overridable for testing/mocking)
    pub api_base_url: String,

    /// Sandbox transactions (`p_test_request=TRUE`)
    pub test_mode: bool,

    /// Language for gateway messages
    pub lang: String,
}

impl EpaycoConfig {
    /// Load configuration from environment variables.
    ///
    /// Read:
    /// - `EPAYCO_PUBLIC_KEY`, `EPAYCO_PRIVATE_KEY`, `EPAYCO_CUSTOMER_ID`, `EPAYCO_P_KEY`
    /// - `EPAYCO_API_BASE_URL` (optional)
    /// - `EPAYCO_TEST_MODE` (optional, defaults to true)
    /// - `EPAYCO_LANG` (optional, defaults to ES)
    ///
    /// Missing secrets are not fatal here: requests that need them fail with a
    /// configuration error instead.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        let credentials = EpaycoCredentials {
            public_key: env::var("EPAYCO_PUBLIC_KEY").unwrap_or_default(),
            private_key: env::var("EPAYCO_PRIVATE_KEY").unwrap_or_default(),
            customer_id: env::var("EPAYCO_CUSTOMER_ID").unwrap_or_default(),
            p_key: env::var("EPAYCO_P_KEY").unwrap_or_default(),
        };

        let missing = credentials.missing();
        if !missing.is_empty() {
            warn!("ePayco secrets not set: {}", missing.join(", "));
        }

        let test_mode = env::var("EPAYCO_TEST_MODE")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        Self {
            credentials,
            api_base_url: env::var("EPAYCO_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            test_mode,
            lang: env::var("EPAYCO_LANG").unwrap_or_else(|_| "ES".to_string()),
        }
    }

    /// Create config with explicit credentials (sandbox mode)
    pub fn new(credentials: EpaycoCredentials) -> Self {
        Self {
            credentials,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            test_mode: true,
            lang: "ES".to_string(),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: switch between sandbox and live transactions
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}
