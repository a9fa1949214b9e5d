//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the checkout builder, the gateway client and the appointment store,
//! each built once at startup and shared by every request.

use crate::firestore::FirestoreStore;
use crate::google::GoogleAuth;
use std::sync::Arc;
use vaq_core::{BoxedAppointmentStore, BoxedCardGateway, MemoryAppointmentStore, WebhookUrls};
use vaq_epayco::{DeepLink, EpaycoCheckout, EpaycoClient, EpaycoConfig};

/// Which appointment store backs the charge flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, used to derive webhook URLs
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Overrides for the webhook URLs handed to ePayco
    pub response_url: Option<String>,
    pub confirmation_url: Option<String>,
    /// Custom URI scheme of the mobile app
    pub deep_link_scheme: String,
    pub store: StoreBackend,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let store = match std::env::var("APPOINTMENT_STORE").ok().as_deref() {
            Some("firestore") => StoreBackend::Firestore,
            Some("memory") => StoreBackend::Memory,
            _ if environment == "production" => StoreBackend::Firestore,
            _ => StoreBackend::Memory,
        };

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment,
            response_url: std::env::var("EPAYCO_RESPONSE_URL").ok(),
            confirmation_url: std::env::var("EPAYCO_CONFIRMATION_URL").ok(),
            deep_link_scheme: std::env::var("DEEP_LINK_SCHEME")
                .unwrap_or_else(|_| "vaq".to_string()),
            store,
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Webhook URLs handed to the gateway
    pub fn webhook_urls(&self) -> WebhookUrls {
        let mut urls = WebhookUrls::new(&self.base_url);
        if let Some(url) = &self.response_url {
            urls = urls.with_response(url.clone());
        }
        if let Some(url) = &self.confirmation_url {
            urls = urls.with_confirmation(url.clone());
        }
        urls
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: "http://localhost:8080".to_string(),
            environment: "development".to_string(),
            response_url: None,
            confirmation_url: None,
            deep_link_scheme: "vaq".to_string(),
            store: StoreBackend::Memory,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Hosted checkout payload builder
    pub checkout: EpaycoCheckout,
    /// Direct-charge gateway
    pub gateway: BoxedCardGateway,
    /// Appointment documents
    pub store: BoxedAppointmentStore,
    /// Webhook URLs sent with charges
    pub urls: WebhookUrls,
    /// Deep links back into the app
    pub deep_link: DeepLink,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let epayco = EpaycoConfig::from_env();
        let urls = config.webhook_urls();

        let checkout = EpaycoCheckout::from_config(&epayco, urls.clone());

        let gateway = EpaycoClient::new(epayco)
            .map_err(|e| anyhow::anyhow!("Failed to initialize ePayco: {}", e))?;

        let store: BoxedAppointmentStore = match config.store {
            StoreBackend::Firestore => {
                let project_id = std::env::var("FIREBASE_PROJECT_ID")
                    .map_err(|_| anyhow::anyhow!("FIREBASE_PROJECT_ID not set"))?;
                Arc::new(FirestoreStore::new(project_id, GoogleAuth::from_env())?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory appointment store");
                Arc::new(MemoryAppointmentStore::new())
            }
        };

        Ok(Self::from_parts(config, checkout, Arc::new(gateway), store))
    }

    /// Assemble state from prebuilt parts
    pub fn from_parts(
        config: AppConfig,
        checkout: EpaycoCheckout,
        gateway: BoxedCardGateway,
        store: BoxedAppointmentStore,
    ) -> Self {
        Self {
            urls: checkout.urls().clone(),
            deep_link: DeepLink::new(config.deep_link_scheme.clone()),
            checkout,
            gateway,
            store,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..AppConfig::default()
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_socket_addr() {
        let config = AppConfig {
            host: "not a host".to_string(),
            ..AppConfig::default()
        };
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_webhook_urls_from_base() {
        let config = AppConfig {
            base_url: "https://api.vaq.app".to_string(),
            ..AppConfig::default()
        };
        let urls = config.webhook_urls();
        assert_eq!(urls.response, "https://api.vaq.app/payment-response");
        assert_eq!(urls.confirmation, "https://api.vaq.app/payment-confirmation");
    }

    #[test]
    fn test_webhook_url_overrides() {
        let config = AppConfig {
            response_url: Some("https://hooks.vaq.app/r".to_string()),
            ..AppConfig::default()
        };
        let urls = config.webhook_urls();
        assert_eq!(urls.response, "https://hooks.vaq.app/r");
        assert_eq!(urls.confirmation, "http://localhost:8080/payment-confirmation");
    }
}
