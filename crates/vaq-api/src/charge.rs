//! # Direct Charge Flow
//!
//! Tokenize the card, register the customer, charge, then record the outcome
//! on the appointment. When the gateway part fails unexpectedly a compensating
//! write marks the appointment failed; that write is best effort and its own
//! failure is only logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use vaq_core::{
    AppointmentStore, CardGateway, ChargeInstruction, ChargeOutcome, ChargeReceipt,
    ChargeRequest, NewCustomer, PaymentDetail, PaymentError, PaymentResult, PaymentUpdate,
    WebhookUrls,
};
use vaq_epayco::invoice_id;

/// What the charge endpoint answers
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeReply {
    Approved {
        receipt: ChargeReceipt,
        detail: PaymentDetail,
    },
    /// The gateway rejected the card, the customer or the charge
    Declined { error: String, data: Value },
    /// Something other than the gateway's verdict went wrong
    Internal,
}

/// Wire shape of every charge response
#[derive(Debug, Serialize)]
pub struct ChargeResponse {
    pub success: bool,
    pub status: &'static str,
    #[serde(rename = "refPayco", skip_serializing_if = "Option::is_none")]
    pub ref_payco: Option<String>,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ChargeReply {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChargeReply::Approved { .. } | ChargeReply::Declined { .. } => StatusCode::OK,
            ChargeReply::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response_body(&self) -> ChargeResponse {
        match self {
            ChargeReply::Approved { receipt, detail } => ChargeResponse {
                success: true,
                status: "success",
                ref_payco: Some(receipt.ref_payco.clone()),
                transaction_id: Some(receipt.transaction_id.clone()),
                error: None,
                data: serde_json::to_value(detail).ok(),
            },
            ChargeReply::Declined { error, data } => ChargeResponse {
                success: false,
                status: "failure",
                ref_payco: None,
                transaction_id: None,
                error: Some(error.clone()),
                data: Some(data.clone()),
            },
            ChargeReply::Internal => ChargeResponse {
                success: false,
                status: "error",
                ref_payco: None,
                transaction_id: None,
                error: Some("Internal server error. Please try again later.".to_string()),
                data: None,
            },
        }
    }
}

impl IntoResponse for ChargeReply {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response_body())).into_response()
    }
}

/// Gateway half of the flow: token, customer, charge
async fn charge_card(
    gateway: &dyn CardGateway,
    urls: &WebhookUrls,
    request: &ChargeRequest,
    ip: String,
) -> PaymentResult<ChargeOutcome> {
    info!("Tokenizing card for appointment {}", request.appointment_id);
    let token = gateway.tokenize_card(&request.card).await?;

    info!(
        "Creating/updating customer for appointment {}",
        request.appointment_id
    );
    let customer = gateway
        .create_customer(&NewCustomer::for_request(request, &token))
        .await?;

    info!(
        "Processing charge for appointment {}: amount={}",
        request.appointment_id,
        request.amount_string()
    );
    let instruction = ChargeInstruction::for_request(
        request,
        &token,
        &customer,
        invoice_id(&request.appointment_id),
        ip,
        urls,
    );
    gateway.charge(&instruction).await
}

/// Write an outcome the gateway already decided. Failure is logged, never reported.
async fn record(store: &dyn AppointmentStore, appointment_id: &str, update: &PaymentUpdate) {
    if let Err(e) = store.update_payment(appointment_id, update).await {
        error!(
            "Failed to record {} payment on appointment {}: {}",
            update.status().as_str(),
            appointment_id,
            e
        );
    }
}

/// Run a direct charge for a validated request
#[instrument(skip_all, fields(appointment_id = %request.appointment_id, provider = gateway.provider_name()))]
pub async fn process_charge(
    gateway: &dyn CardGateway,
    store: &dyn AppointmentStore,
    urls: &WebhookUrls,
    request: &ChargeRequest,
    ip: String,
) -> ChargeReply {
    let appointment_id = request.appointment_id.as_str();

    match charge_card(gateway, urls, request, ip).await {
        Ok(ChargeOutcome::Approved(receipt)) => {
            let detail = PaymentDetail::card(request.amount, Utc::now());
            let update = PaymentUpdate::Paid {
                receipt: receipt.clone(),
                detail: detail.clone(),
            };
            record(store, appointment_id, &update).await;

            info!(
                "Payment successful: appointment={}, refPayco={}, transactionId={}",
                appointment_id, receipt.ref_payco, receipt.transaction_id
            );
            ChargeReply::Approved { receipt, detail }
        }
        Ok(ChargeOutcome::Declined { message, details }) => {
            record(store, appointment_id, &PaymentUpdate::failed(message.clone())).await;

            warn!("Payment failed: appointment={}, error={}", appointment_id, message);
            ChargeReply::Declined {
                error: message,
                data: details,
            }
        }
        Err(e) if e.is_gateway_rejection() => {
            let message = e.client_message();
            record(store, appointment_id, &PaymentUpdate::failed(message.clone())).await;

            warn!("Payment rejected: appointment={}, error={}", appointment_id, message);
            ChargeReply::Declined {
                data: json!({ "message": message }),
                error: message,
            }
        }
        Err(e) => {
            error!("Error processing payment for {}: {}", appointment_id, e);
            compensate(store, appointment_id, &e).await;
            ChargeReply::Internal
        }
    }
}

/// Mark the appointment failed after an unexpected error
async fn compensate(store: &dyn AppointmentStore, appointment_id: &str, cause: &PaymentError) {
    let update = PaymentUpdate::failed(cause.to_string());
    if let Err(e) = store.update_payment(appointment_id, &update).await {
        error!(
            "Failed to update appointment {} with error status: {}",
            appointment_id, e
        );
    }
}
