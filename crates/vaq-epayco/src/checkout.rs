//! # ePayco Hosted Checkout
//!
//! Builds the signed payload the mobile app hands to the ePayco checkout widget.
//! Nothing here touches the network: the payload is a pure function of the
//! request, the account credentials and the webhook URLs.

use crate::config::{EpaycoConfig, EpaycoCredentials};
use crate::signature::{invoice_id, SignaturePayload};
use serde::Serialize;
use tracing::{debug, instrument};
use vaq_core::{CheckoutRequest, PaymentResult, WebhookUrls, COUNTRY_CO, CURRENCY_COP};

/// Correlation blob carried through the gateway in the `external` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalCorrelation {
    pub appointment_id: String,
    pub customer_uid: String,
    pub customer_email: String,
    pub customer_name: String,
}

/// Fields consumed by the checkout widget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutPayload {
    pub public_key: String,
    pub p_key: String,
    pub amount: String,
    pub name: String,
    pub currency: String,
    pub invoice: String,
    pub tax: String,
    pub description: String,
    /// Response webhook URL
    pub response: String,
    /// Confirmation webhook URL
    pub confirmation: String,
    #[serde(rename = "testMode")]
    pub test_mode: bool,
    /// JSON-encoded [`ExternalCorrelation`]
    pub external: String,
    /// Digest over the signed field set
    pub signature: String,
}

/// Builder for hosted-checkout payloads
#[derive(Debug, Clone)]
pub struct EpaycoCheckout {
    credentials: EpaycoCredentials,
    urls: WebhookUrls,
    test_mode: bool,
}

impl EpaycoCheckout {
    pub fn new(credentials: EpaycoCredentials, urls: WebhookUrls, test_mode: bool) -> Self {
        Self {
            credentials,
            urls,
            test_mode,
        }
    }

    pub fn from_config(config: &EpaycoConfig, urls: WebhookUrls) -> Self {
        Self::new(config.credentials.clone(), urls, config.test_mode)
    }

    pub fn urls(&self) -> &WebhookUrls {
        &self.urls
    }

    /// Build a payload with a fresh invoice id
    pub fn build(&self, request: &CheckoutRequest) -> PaymentResult<CheckoutPayload> {
        self.credentials.ensure_complete()?;
        self.build_with_invoice(request, invoice_id(&request.appointment_id))
    }

    /// Build a payload for a known invoice id
    #[instrument(skip(self, request), fields(appointment_id = %request.appointment_id))]
    pub fn build_with_invoice(
        &self,
        request: &CheckoutRequest,
        invoice: String,
    ) -> PaymentResult<CheckoutPayload> {
        self.credentials.ensure_complete()?;

        let mut fields = self.signature_payload(request, &invoice);
        let signature = fields.sign(&self.credentials.p_key);

        debug!("Signed checkout payload: {} fields", fields.len());

        let external = serde_json::to_string(&ExternalCorrelation {
            appointment_id: request.appointment_id.clone(),
            customer_uid: request.customer.uid.clone(),
            customer_email: request.customer.email.clone(),
            customer_name: request.customer.name.clone(),
        })?;

        Ok(CheckoutPayload {
            public_key: self.credentials.public_key.clone(),
            p_key: self.credentials.p_key.clone(),
            amount: request.amount_string(),
            name: request.description.clone(),
            currency: CURRENCY_COP.to_string(),
            invoice,
            tax: "0".to_string(),
            description: request.description.clone(),
            response: self.urls.response.clone(),
            confirmation: self.urls.confirmation.clone(),
            test_mode: self.test_mode,
            external,
            signature,
        })
    }

    /// The unsigned field set for a request
    pub fn signature_payload(&self, request: &CheckoutRequest, invoice: &str) -> SignaturePayload {
        let amount = request.amount_string();
        let creds = &self.credentials;

        let mut fields = SignaturePayload::new();
        fields
            .set("p_cust_id_cliente", creds.customer_id.as_str())
            .set("p_key", creds.p_key.as_str())
            .set("p_amount", amount.as_str())
            .set("p_currency_code", CURRENCY_COP)
            .set("p_description", request.description.as_str())
            .set("p_customer_email", request.customer.email.as_str())
            .set("p_customer_document", "")
            .set("p_customer_name", request.customer.name.as_str())
            .set("p_customer_lastname", "")
            .set("p_customer_phone", "")
            .set("p_customer_address", "")
            .set("p_customer_city", "")
            .set("p_customer_country", COUNTRY_CO)
            .set("p_test_request", if self.test_mode { "TRUE" } else { "FALSE" })
            .set("p_url_response", self.urls.response.as_str())
            .set("p_url_confirmation", self.urls.confirmation.as_str())
            .set("p_extra1", request.appointment_id.as_str())
            .set("p_extra2", request.customer.uid.as_str())
            .set("p_invoice", invoice)
            .set("p_tax", "0")
            .set("p_tax_base", amount.as_str());
        fields
    }
}
