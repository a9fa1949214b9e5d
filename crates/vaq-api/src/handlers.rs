//! # Request Handlers
//!
//! Axum request handlers for the payment bridge: hosted checkout, direct
//! charges and the two ePayco webhooks.

use crate::charge::{process_charge, ChargeReply};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument};
use url::form_urlencoded;
use vaq_core::{validate_charge, validate_checkout, PaymentError};
use vaq_epayco::{redirect_page, CallbackParams, CheckoutPayload};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Start checkout response
#[derive(Debug, Serialize)]
pub struct StartCheckoutResponse {
    pub success: bool,
    #[serde(rename = "checkoutPayload")]
    pub checkout_payload: CheckoutPayload,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map an error to a response; 5xx bodies never carry internal detail
fn payment_error_to_response(err: PaymentError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.client_message())))
}

/// Decode a JSON body; anything unreadable counts as no body
fn parse_json_body(body: &Bytes) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Best guess at the caller's address, for the gateway's fraud checks
fn client_ip(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Query and body of a gateway callback, merged
fn callback_params(query: Option<String>, headers: &HeaderMap, body: &Bytes) -> CallbackParams {
    let query_pairs: Vec<(String, String)> = query
        .as_deref()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    CallbackParams::merge(query_pairs, CallbackParams::parse_body(content_type, body))
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "vaq-pay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Any method other than POST on a POST-only endpoint
pub async fn method_not_allowed() -> ApiError {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new(
            "Method not allowed. Only POST requests are supported.",
        )),
    )
}

/// Build a signed checkout payload for the hosted widget
#[instrument(skip(state, body))]
pub async fn start_checkout(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StartCheckoutResponse>, ApiError> {
    let request = validate_checkout(&parse_json_body(&body)).map_err(payment_error_to_response)?;

    let payload = state.checkout.build(&request).map_err(|e| {
        error!("Error creating checkout: {}", e);
        payment_error_to_response(e)
    })?;

    info!(
        appointment_id = %request.appointment_id,
        amount = request.amount_cop,
        customer_uid = %request.customer.uid,
        invoice = %payload.invoice,
        "Checkout created successfully"
    );

    Ok(Json(StartCheckoutResponse {
        success: true,
        checkout_payload: payload,
    }))
}

/// Charge a card directly and record the outcome on the appointment
#[instrument(skip(state, headers, body))]
pub async fn charge_appointment(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ChargeReply, ApiError> {
    let request = validate_charge(&parse_json_body(&body)).map_err(payment_error_to_response)?;

    Ok(process_charge(
        state.gateway.as_ref(),
        state.store.as_ref(),
        &state.urls,
        &request,
        client_ip(&headers),
    )
    .await)
}

/// ePayco response webhook: bounce the browser back into the app
#[instrument(skip_all)]
pub async fn payment_response(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Html<String> {
    let params = callback_params(query, &headers, &body);
    info!(params = ?params.as_map(), "ePayco response received");

    let outcome = params.outcome();
    let link = state.deep_link.url(outcome, &params.ref_payco());

    info!("Redirecting to {}", link);
    Html(redirect_page(&link))
}

/// ePayco confirmation webhook.
///
/// Only acknowledges receipt: the notification's signature is not checked and
/// the appointment is not updated from it.
#[instrument(skip_all)]
pub async fn payment_confirmation(
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let params = callback_params(query, &headers, &body);
    info!(
        params = ?params.as_map(),
        ref_payco = %params.ref_payco(),
        state = %params.response_state(),
        "ePayco confirmation received"
    );

    (StatusCode::OK, "OK")
}
