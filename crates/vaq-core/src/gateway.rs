//! # Card Gateway Trait
//!
//! Seam between the charge flow and the payment provider that tokenizes cards,
//! registers customers and captures charges.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CardGateway (trait)                      │
//! │  ├── tokenize_card()                                        │
//! │  ├── create_customer()                                      │
//! │  ├── charge()                                               │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                 ┌──────────┴──────────┐
//!         ┌───────┴───────┐     ┌───────┴───────┐
//!         │ EpaycoClient  │     │  test fakes   │
//!         └───────────────┘     └───────────────┘
//! ```
//!
//! The gateway handle is built once at startup and shared by reference; every
//! implementation must be safe to call concurrently.

use crate::error::PaymentResult;
use crate::request::{CardDetails, ChargeRequest, CURRENCY_COP};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Token standing in for a card on later gateway calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardToken {
    pub id: String,
}

/// Customer registration sent after tokenizing a card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCustomer {
    pub token_card: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    /// Make the tokenized card the customer's default
    pub default: bool,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub cell_phone: String,
}

impl NewCustomer {
    pub fn for_request(request: &ChargeRequest, token: &CardToken) -> Self {
        let customer = &request.customer;
        Self {
            token_card: token.id.clone(),
            name: customer.name.clone(),
            last_name: customer.last_name.clone(),
            email: customer.email.clone(),
            default: true,
            city: customer.city_or_default().to_string(),
            address: customer.address_or_default().to_string(),
            phone: customer.phone_or_default().to_string(),
            cell_phone: customer.phone_or_default().to_string(),
        }
    }
}

/// Customer record created by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCustomer {
    pub customer_id: String,
}

/// Correlation fields echoed back by the gateway in webhooks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChargeExtras {
    pub extra1: String,
    pub extra2: String,
    pub extra3: String,
    pub extra4: String,
    pub extra5: String,
    pub extra6: String,
}

/// Everything the gateway needs to capture a charge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargeInstruction {
    pub token_card: String,
    pub customer_id: String,
    pub doc_type: String,
    pub doc_number: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub cell_phone: String,
    /// Invoice id
    pub bill: String,
    pub description: String,
    pub value: String,
    pub tax: String,
    pub tax_base: String,
    pub currency: String,
    /// Number of installments
    pub dues: String,
    pub ip: String,
    pub url_response: String,
    pub url_confirmation: String,
    pub method_confirmation: String,
    pub use_default_card_customer: bool,
    pub extras: ChargeExtras,
}

impl ChargeInstruction {
    /// Build a single-installment COP charge for an appointment
    pub fn for_request(
        request: &ChargeRequest,
        token: &CardToken,
        customer: &GatewayCustomer,
        bill: String,
        ip: String,
        urls: &WebhookUrls,
    ) -> Self {
        let c = &request.customer;
        let amount = request.amount_string();
        Self {
            token_card: token.id.clone(),
            customer_id: customer.customer_id.clone(),
            doc_type: c.doc_type.clone(),
            doc_number: c.doc_number.clone(),
            name: c.name.clone(),
            last_name: c.last_name.clone(),
            email: c.email.clone(),
            city: c.city_or_default().to_string(),
            address: c.address_or_default().to_string(),
            phone: c.phone_or_default().to_string(),
            cell_phone: c.phone_or_default().to_string(),
            bill,
            description: request.description.clone(),
            value: amount.clone(),
            tax: "0".to_string(),
            tax_base: amount,
            currency: CURRENCY_COP.to_string(),
            dues: "1".to_string(),
            ip,
            url_response: urls.response.clone(),
            url_confirmation: urls.confirmation.clone(),
            method_confirmation: "GET".to_string(),
            use_default_card_customer: true,
            extras: ChargeExtras {
                extra1: request.appointment_id.clone(),
                extra2: c.email.clone(),
                ..ChargeExtras::default()
            },
        }
    }
}

/// Identifiers of an approved charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub ref_payco: String,
    pub transaction_id: String,
}

/// Result of a charge the gateway processed
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    Approved(ChargeReceipt),
    /// The gateway declined; `details` is its raw error payload
    Declined {
        message: String,
        details: serde_json::Value,
    },
}

/// Core trait for card-charging providers.
///
/// Gateway-reported rejections during tokenization or customer creation come
/// back as `PaymentError::ProviderError`; transport failures as
/// `PaymentError::NetworkError`.
#[async_trait]
pub trait CardGateway: Send + Sync {
    /// Exchange raw card data for a reusable token.
    async fn tokenize_card(&self, card: &CardDetails) -> PaymentResult<CardToken>;

    /// Register a customer owning the tokenized card.
    async fn create_customer(&self, customer: &NewCustomer) -> PaymentResult<GatewayCustomer>;

    /// Capture a charge. A decline is a normal outcome, not an error.
    async fn charge(&self, instruction: &ChargeInstruction) -> PaymentResult<ChargeOutcome>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway handle (dynamic dispatch)
pub type BoxedCardGateway = Arc<dyn CardGateway>;

/// Webhook endpoints the gateway calls back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookUrls {
    /// Where the user's browser lands after paying
    pub response: String,
    /// Server-to-server confirmation
    pub confirmation: String,
}

impl WebhookUrls {
    pub const RESPONSE_PATH: &'static str = "/payment-response";
    pub const CONFIRMATION_PATH: &'static str = "/payment-confirmation";

    /// Derive both URLs from the public base URL of this service
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            response: format!("{}{}", base, Self::RESPONSE_PATH),
            confirmation: format!("{}{}", base, Self::CONFIRMATION_PATH),
        }
    }

    pub fn with_response(mut self, url: impl Into<String>) -> Self {
        self.response = url.into();
        self
    }

    pub fn with_confirmation(mut self, url: impl Into<String>) -> Self {
        self.confirmation = url.into();
        self
    }
}

impl Default for WebhookUrls {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ChargeCustomer;

    fn request() -> ChargeRequest {
        ChargeRequest {
            appointment_id: "apt-9".into(),
            customer: ChargeCustomer {
                name: "Ana".into(),
                last_name: "Gómez".into(),
                email: "ana@example.com".into(),
                doc_type: "CC".into(),
                doc_number: "1020".into(),
                phone: None,
                city: Some("Medellín".into()),
                address: None,
            },
            card: CardDetails {
                number: "4575623182290326".into(),
                exp_month: "12".into(),
                exp_year: "2025".into(),
                cvc: "123".into(),
            },
            amount: 10000.0,
            description: "Consulta".into(),
        }
    }

    #[test]
    fn test_webhook_urls() {
        let urls = WebhookUrls::new("https://api.vaq.app/");
        assert_eq!(urls.response, "https://api.vaq.app/payment-response");
        assert_eq!(urls.confirmation, "https://api.vaq.app/payment-confirmation");
    }

    #[test]
    fn test_charge_instruction_fields() {
        let token = CardToken { id: "tok_1".into() };
        let customer = GatewayCustomer {
            customer_id: "cus_1".into(),
        };
        let instruction = ChargeInstruction::for_request(
            &request(),
            &token,
            &customer,
            "VAQ-apt-9-1".into(),
            "10.0.0.1".into(),
            &WebhookUrls::default(),
        );

        assert_eq!(instruction.value, "10000");
        assert_eq!(instruction.tax_base, "10000");
        assert_eq!(instruction.currency, "COP");
        assert_eq!(instruction.city, "Medellín");
        assert_eq!(instruction.phone, "3000000000");
        assert_eq!(instruction.extras.extra1, "apt-9");
        assert_eq!(instruction.extras.extra2, "ana@example.com");
        assert_eq!(instruction.extras.extra3, "");
    }

    #[test]
    fn test_new_customer_defaults() {
        let customer = NewCustomer::for_request(&request(), &CardToken { id: "tok_1".into() });
        assert!(customer.default);
        assert_eq!(customer.address, "N/A");
        assert_eq!(customer.cell_phone, customer.phone);
    }
}
