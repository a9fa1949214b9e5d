//! # vaq-epayco
//!
//! ePayco integration for the VAQ payment bridge.
//!
//! Two ways of taking a payment:
//!
//! 1. **EpaycoCheckout** - hosted checkout widget
//!    - Signed payload built server-side, no network calls
//!    - The app renders the widget in a WebView
//!    - Outcome comes back through the response/confirmation webhooks
//!
//! 2. **EpaycoClient** - direct card charges
//!    - Tokenize card, create customer, charge
//!    - Implements `vaq_core::CardGateway`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vaq_epayco::{EpaycoCheckout, EpaycoConfig};
//! use vaq_core::WebhookUrls;
//!
//! let config = EpaycoConfig::from_env();
//! let checkout = EpaycoCheckout::from_config(&config, WebhookUrls::new("https://api.vaq.app"));
//!
//! let payload = checkout.build(&request)?;
//! // Hand payload to the app
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! use vaq_epayco::{redirect_page, CallbackParams, DeepLink};
//!
//! let params = CallbackParams::merge(query, CallbackParams::parse_body(content_type, &body));
//! let link = DeepLink::default().url(params.outcome(), &params.ref_payco());
//! let html = redirect_page(&link);
//! ```

pub mod checkout;
pub mod client;
pub mod config;
pub mod signature;
pub mod webhook;

// Re-exports
pub use checkout::{CheckoutPayload, EpaycoCheckout, ExternalCorrelation};
pub use client::EpaycoClient;
pub use config::{EpaycoConfig, EpaycoCredentials};
pub use signature::{
    generate_signature, invoice_id, invoice_id_at, signing_string, SignaturePayload,
    INVOICE_PREFIX,
};
pub use webhook::{redirect_page, CallbackOutcome, CallbackParams, DeepLink};
