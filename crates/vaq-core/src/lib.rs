//! # vaq-core
//!
//! Core types and traits for the VAQ payment bridge.
//!
//! This crate provides:
//! - `CheckoutRequest` and `ChargeRequest`, the typed request bodies
//! - `validate_checkout` / `validate_charge`, first-failure-wins validation of untyped bodies
//! - `CardGateway` trait for card-charging providers
//! - `AppointmentStore` trait and `PaymentUpdate` for recording payment outcomes
//! - `PaymentError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use vaq_core::{validate_charge, CardGateway, NewCustomer};
//!
//! let request = validate_charge(&body)?;
//! let token = gateway.tokenize_card(&request.card).await?;
//! let customer = gateway.create_customer(&NewCustomer::for_request(&request, &token)).await?;
//! ```

pub mod appointment;
pub mod error;
pub mod gateway;
pub mod request;
pub mod validation;

// Re-exports for convenience
pub use appointment::{
    AppointmentPayment, AppointmentStore, BoxedAppointmentStore, MemoryAppointmentStore,
    PaymentDetail, PaymentStatus, PaymentUpdate,
};
pub use error::{PaymentError, PaymentResult};
pub use gateway::{
    BoxedCardGateway, CardGateway, CardToken, ChargeExtras, ChargeInstruction, ChargeOutcome,
    ChargeReceipt, GatewayCustomer, NewCustomer, WebhookUrls,
};
pub use request::{
    format_amount, CardDetails, ChargeCustomer, ChargeRequest, CheckoutCustomer,
    CheckoutRequest, COUNTRY_CO, CURRENCY_COP,
};
pub use validation::{validate_charge, validate_checkout};
