//! # ePayco REST Client
//!
//! `CardGateway` implementation over ePayco's REST API: card tokenization,
//! customer creation and charges. Every operation authenticates with the
//! account keys first and then calls the endpoint with a bearer token.

use crate::config::EpaycoConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};
use vaq_core::{
    CardDetails, CardGateway, CardToken, ChargeInstruction, ChargeOutcome, ChargeReceipt,
    GatewayCustomer, NewCustomer, PaymentError, PaymentResult,
};

const PROVIDER: &str = "epayco";

const LOGIN_PATH: &str = "/v1/auth/login";
const TOKENS_PATH: &str = "/v1/tokens";
const CUSTOMERS_PATH: &str = "/payment/v1/customer/create";
const CHARGES_PATH: &str = "/payment/v1/charge/create";

/// ePayco gateway client
///
/// Built once at startup and shared; holds no per-request state.
pub struct EpaycoClient {
    config: EpaycoConfig,
    client: Client,
}

impl EpaycoClient {
    /// Create a new client
    pub fn new(config: EpaycoConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    /// Exchange the account keys for a bearer token
    async fn bearer_token(&self) -> PaymentResult<String> {
        let creds = &self.config.credentials;
        if creds.public_key.is_empty() || creds.private_key.is_empty() {
            return Err(PaymentError::Configuration(
                "EPAYCO_PUBLIC_KEY and EPAYCO_PRIVATE_KEY are required for direct charges"
                    .to_string(),
            ));
        }

        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&json!({
                "public_key": creds.public_key,
                "private_key": creds.private_key,
            }))
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("ePayco login failed: status={}", status);
            return Err(if status.is_server_error() {
                PaymentError::NetworkError(format!("ePayco login HTTP {}", status))
            } else {
                PaymentError::Configuration(format!("ePayco authentication failed: HTTP {}", status))
            });
        }

        let login: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse ePayco login response: {}", e))
        })?;

        login
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PaymentError::Configuration("ePayco login returned no token".to_string()))
    }

    /// POST an authenticated request and decode the response envelope.
    ///
    /// 5xx responses and transport failures are network errors; anything else
    /// is handed back for the caller to judge.
    async fn post(&self, path: &str, body: Value) -> PaymentResult<Envelope> {
        let token = self.bearer_token().await?;

        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&self.with_context(body))
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if status.is_server_error() {
            error!("ePayco API error: path={}, status={}", path, status);
            return Err(PaymentError::NetworkError(format!(
                "ePayco HTTP {} on {}",
                status, path
            )));
        }

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => Ok(envelope),
            Err(_) if status != StatusCode::OK => Ok(Envelope::rejected(format!(
                "HTTP {}: {}",
                status, text
            ))),
            Err(e) => Err(PaymentError::Serialization(format!(
                "Failed to parse ePayco response: {}",
                e
            ))),
        }
    }

    /// Attach the sandbox flag and language every call carries
    fn with_context(&self, mut body: Value) -> Value {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("test".to_string(), Value::Bool(self.config.test_mode));
            obj.insert("lang".to_string(), Value::String(self.config.lang.clone()));
        }
        body
    }
}

#[async_trait]
impl CardGateway for EpaycoClient {
    #[instrument(skip(self, card), fields(last4 = %card.last4()))]
    async fn tokenize_card(&self, card: &CardDetails) -> PaymentResult<CardToken> {
        let envelope = self
            .post(
                TOKENS_PATH,
                json!({
                    "card[number]": card.number,
                    "card[exp_year]": card.exp_year,
                    "card[exp_month]": card.exp_month,
                    "card[cvc]": card.cvc,
                    "hasCvv": true,
                }),
            )
            .await?;

        if !envelope.success {
            return Err(PaymentError::provider(
                PROVIDER,
                format!("Token creation failed: {}", envelope.error_message("Unknown error")),
            ));
        }

        let id = envelope
            .id
            .as_ref()
            .or_else(|| envelope.data.as_ref().and_then(|d| d.get("id")))
            .and_then(value_to_string)
            .ok_or_else(|| {
                PaymentError::Serialization("ePayco token response has no id".to_string())
            })?;

        debug!("Card tokenized");
        Ok(CardToken { id })
    }

    #[instrument(skip(self, customer), fields(email = %customer.email))]
    async fn create_customer(&self, customer: &NewCustomer) -> PaymentResult<GatewayCustomer> {
        let envelope = self
            .post(CUSTOMERS_PATH, serde_json::to_value(customer)?)
            .await?;

        if !envelope.success {
            return Err(PaymentError::provider(
                PROVIDER,
                format!(
                    "Customer creation failed: {}",
                    envelope.error_message("Unknown error")
                ),
            ));
        }

        let customer_id = envelope
            .data_field("customerId")
            .ok_or_else(|| {
                PaymentError::Serialization("ePayco customer response has no customerId".to_string())
            })?;

        debug!("Customer created: {}", customer_id);
        Ok(GatewayCustomer { customer_id })
    }

    #[instrument(skip(self, instruction), fields(bill = %instruction.bill, value = %instruction.value))]
    async fn charge(&self, instruction: &ChargeInstruction) -> PaymentResult<ChargeOutcome> {
        let envelope = self
            .post(CHARGES_PATH, serde_json::to_value(instruction)?)
            .await?;

        if !envelope.success {
            let message = envelope.error_message("Payment failed");
            info!("ePayco declined charge: {}", message);
            return Ok(ChargeOutcome::Declined {
                message,
                details: envelope.error.unwrap_or(Value::Null),
            });
        }

        let ref_payco = envelope.data_field("ref_payco");
        let transaction_id = envelope.data_field("transaction_id");

        match (ref_payco, transaction_id) {
            (Some(ref_payco), Some(transaction_id)) => {
                Ok(ChargeOutcome::Approved(ChargeReceipt {
                    ref_payco,
                    transaction_id,
                }))
            }
            _ => Err(PaymentError::Serialization(
                "ePayco charge response is missing ref_payco or transaction_id".to_string(),
            )),
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// ePayco API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Common `{success, data, error}` wrapper of ePayco responses
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Envelope {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            error: Some(json!({ "message": message })),
            ..Self::default()
        }
    }

    /// Gateway error message, falling back to `default`
    fn error_message(&self, default: &str) -> String {
        let message = match &self.error {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Object(obj)) => obj.get("message").and_then(value_to_string),
            _ => None,
        };
        message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn data_field(&self, key: &str) -> Option<String> {
        self.data.as_ref()?.get(key).and_then(value_to_string)
    }
}

/// Render a scalar JSON value as text (ePayco mixes numeric and string ids)
fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EpaycoCredentials;
    use vaq_core::{ChargeCustomer, ChargeRequest, WebhookUrls};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card() -> CardDetails {
        CardDetails {
            number: "4575623182290326".into(),
            exp_month: "12".into(),
            exp_year: "2025".into(),
            cvc: "123".into(),
        }
    }

    fn client(server: &MockServer) -> EpaycoClient {
        let config = EpaycoConfig::new(EpaycoCredentials::new("pub", "priv", "cust", "pkey"))
            .with_api_base_url(server.uri());
        EpaycoClient::new(config).unwrap()
    }

    fn instruction() -> ChargeInstruction {
        let request = ChargeRequest {
            appointment_id: "apt-1".into(),
            customer: ChargeCustomer {
                name: "Test".into(),
                last_name: "User".into(),
                email: "test@example.com".into(),
                doc_type: "CC".into(),
                doc_number: "1234567890".into(),
                phone: None,
                city: None,
                address: None,
            },
            card: card(),
            amount: 10000.0,
            description: "Test Payment".into(),
        };
        ChargeInstruction::for_request(
            &request,
            &CardToken { id: "tok_1".into() },
            &GatewayCustomer {
                customer_id: "cus_1".into(),
            },
            "VAQ-apt-1-1".into(),
            "127.0.0.1".into(),
            &WebhookUrls::default(),
        )
    }

    async fn mount_login(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .and(body_partial_json(json!({ "public_key": "pub", "private_key": "priv" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt" })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_tokenize_card() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(TOKENS_PATH))
            .and(header("authorization", "Bearer jwt"))
            .and(body_partial_json(json!({ "card[number]": "4575623182290326", "hasCvv": true })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "id": "tok_abc" })),
            )
            .mount(&server)
            .await;

        let token = client(&server).tokenize_card(&card()).await.unwrap();
        assert_eq!(token.id, "tok_abc");
    }

    #[tokio::test]
    async fn test_tokenize_rejected() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(TOKENS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": { "message": "Tarjeta inválida" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).tokenize_card(&card()).await.unwrap_err();
        assert!(err.is_gateway_rejection());
        assert_eq!(err.client_message(), "Token creation failed: Tarjeta inválida");
    }

    #[tokio::test]
    async fn test_create_customer() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(CUSTOMERS_PATH))
            .and(body_partial_json(json!({ "token_card": "tok_1", "default": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "customerId": "cus_xyz" }
            })))
            .mount(&server)
            .await;

        let customer = NewCustomer {
            token_card: "tok_1".into(),
            name: "Test".into(),
            last_name: "User".into(),
            email: "test@example.com".into(),
            default: true,
            city: "Bogotá".into(),
            address: "N/A".into(),
            phone: "3000000000".into(),
            cell_phone: "3000000000".into(),
        };

        let created = client(&server).create_customer(&customer).await.unwrap();
        assert_eq!(created.customer_id, "cus_xyz");
    }

    #[tokio::test]
    async fn test_charge_approved_with_numeric_ref() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(CHARGES_PATH))
            .and(body_partial_json(json!({
                "bill": "VAQ-apt-1-1",
                "currency": "COP",
                "dues": "1",
                "test": true,
                "extras": { "extra1": "apt-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "ref_payco": 123456, "transaction_id": "tx-789" }
            })))
            .mount(&server)
            .await;

        let outcome = client(&server).charge(&instruction()).await.unwrap();
        assert_eq!(
            outcome,
            ChargeOutcome::Approved(ChargeReceipt {
                ref_payco: "123456".into(),
                transaction_id: "tx-789".into(),
            })
        );
    }

    #[tokio::test]
    async fn test_charge_declined() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(CHARGES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": { "message": "Transacción rechazada", "code": "E035" }
            })))
            .mount(&server)
            .await;

        match client(&server).charge(&instruction()).await.unwrap() {
            ChargeOutcome::Declined { message, details } => {
                assert_eq!(message, "Transacción rechazada");
                assert_eq!(details["code"], "E035");
            }
            other => panic!("expected decline, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_network_error() {
        let server = MockServer::start().await;
        mount_login(&server).await;

        Mock::given(method("POST"))
            .and(path(CHARGES_PATH))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server).charge(&instruction()).await.unwrap_err();
        assert!(matches!(err, PaymentError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_login_rejected_is_configuration_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).tokenize_card(&card()).await.unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }

    #[test]
    fn test_error_message_shapes() {
        let envelope = Envelope {
            error: Some(json!("plain text")),
            ..Envelope::default()
        };
        assert_eq!(envelope.error_message("x"), "plain text");

        let envelope = Envelope::default();
        assert_eq!(envelope.error_message("Payment failed"), "Payment failed");
    }
}
