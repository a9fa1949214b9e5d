//! # Firestore Appointment Store
//!
//! Writes payment outcomes onto `appointments/{id}` through the Firestore REST
//! API. Updates carry an explicit field mask and require the document to exist,
//! so a payment can never create an appointment.

use crate::google::GoogleAuth;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, error, instrument};
use url::Url;
use vaq_core::{AppointmentStore, PaymentError, PaymentResult, PaymentUpdate};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com";
const COLLECTION: &str = "appointments";

/// Firestore-backed [`AppointmentStore`]
pub struct FirestoreStore {
    client: Client,
    base_url: String,
    project_id: String,
    auth: GoogleAuth,
}

impl FirestoreStore {
    pub fn new(project_id: impl Into<String>, auth: GoogleAuth) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            auth,
        })
    }

    /// Builder: set custom API base URL (emulator or tests)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// URL of `appointments/{id}`. The id is always a single encoded path
    /// segment, so it cannot address any other document.
    fn document_url(&self, appointment_id: &str) -> PaymentResult<Url> {
        if matches!(appointment_id, "" | "." | "..") {
            return Err(PaymentError::Store(format!(
                "Invalid appointment id: {:?}",
                appointment_id
            )));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PaymentError::Configuration(format!("Firestore base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                PaymentError::Configuration(format!("Firestore base URL: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                COLLECTION,
            ])
            .push(appointment_id);
        Ok(url)
    }
}

/// Firestore typed-value encoding of the fields an update touches
fn encode_update(update: &PaymentUpdate) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(
        "paymentStatus".into(),
        string_value(update.status().as_str()),
    );
    fields.insert(
        "lastUpdatedAt".into(),
        json!({ "timestampValue": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true) }),
    );

    match update {
        PaymentUpdate::Paid { receipt, detail } => {
            fields.insert("paymentRef".into(), string_value(&receipt.ref_payco));
            fields.insert("transactionId".into(), string_value(&receipt.transaction_id));

            let mut data = Map::new();
            data.insert("amount".into(), number_value(detail.amount));
            data.insert("currency".into(), string_value(&detail.currency));
            data.insert("method".into(), string_value(&detail.method));
            data.insert("processedAt".into(), string_value(&detail.processed_at));
            fields.insert("paymentData".into(), json!({ "mapValue": { "fields": data } }));
        }
        PaymentUpdate::Failed { error } => {
            fields.insert("paymentError".into(), string_value(error));
        }
    }

    fields
}

fn string_value(s: &str) -> Value {
    json!({ "stringValue": s })
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        json!({ "integerValue": format!("{}", n as i64) })
    } else {
        json!({ "doubleValue": n })
    }
}

#[async_trait]
impl AppointmentStore for FirestoreStore {
    #[instrument(skip(self, update), fields(status = update.status().as_str()))]
    async fn update_payment(
        &self,
        appointment_id: &str,
        update: &PaymentUpdate,
    ) -> PaymentResult<()> {
        let url = self.document_url(appointment_id)?;
        let fields = encode_update(update);

        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));

        let token = self
            .auth
            .access_token(&self.client)
            .await
            .map_err(|e| PaymentError::Store(e.to_string()))?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(token)
            .query(&query)
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| PaymentError::Store(format!("Firestore unreachable: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            debug!("Updated appointments/{}", appointment_id);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!("Firestore update failed: status={}, body={}", status, body);

        Err(match status {
            StatusCode::NOT_FOUND => PaymentError::Store(format!(
                "No document to update: {}/{}",
                COLLECTION, appointment_id
            )),
            _ => PaymentError::Store(format!("Firestore HTTP {}", status)),
        })
    }

    fn store_name(&self) -> &'static str {
        "firestore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaq_core::{ChargeReceipt, PaymentDetail};
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOC_PATH: &str = "/v1/projects/vac-plus/databases/(default)/documents/appointments/apt-1";

    fn store(server: &MockServer) -> FirestoreStore {
        FirestoreStore::new("vac-plus", GoogleAuth::Static("tok".into()))
            .unwrap()
            .with_base_url(server.uri())
    }

    fn paid() -> PaymentUpdate {
        PaymentUpdate::Paid {
            receipt: ChargeReceipt {
                ref_payco: "123".into(),
                transaction_id: "tx-1".into(),
            },
            detail: PaymentDetail::card(10000.0, Utc::now()),
        }
    }

    #[test]
    fn test_encode_paid() {
        let fields = encode_update(&paid());
        assert_eq!(fields["paymentStatus"], json!({ "stringValue": "paid" }));
        assert_eq!(fields["paymentRef"], json!({ "stringValue": "123" }));
        assert_eq!(
            fields["paymentData"]["mapValue"]["fields"]["amount"],
            json!({ "integerValue": "10000" })
        );
        assert!(fields["lastUpdatedAt"]["timestampValue"].is_string());
        assert!(!fields.contains_key("paymentError"));
    }

    #[test]
    fn test_encode_failed() {
        let fields = encode_update(&PaymentUpdate::failed("Payment failed"));
        assert_eq!(fields["paymentStatus"], json!({ "stringValue": "failed" }));
        assert_eq!(fields["paymentError"], json!({ "stringValue": "Payment failed" }));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn test_number_value() {
        assert_eq!(number_value(1.5), json!({ "doubleValue": 1.5 }));
    }

    #[tokio::test]
    async fn test_update_sends_masked_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .and(header("authorization", "Bearer tok"))
            .and(query_param("currentDocument.exists", "true"))
            .and(query_param("updateMask.fieldPaths", "paymentStatus"))
            .and(body_partial_json(json!({
                "fields": { "transactionId": { "stringValue": "tx-1" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        store(&server).update_payment("apt-1", &paid()).await.unwrap();
    }

    #[tokio::test]
    async fn test_id_with_dot_segments_stays_in_collection() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(
                "/v1/projects/vac-plus/databases/(default)/documents/appointments/x%2F..%2F..%2Fusers%2Fvictim",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/v1/projects/vac-plus/databases/(default)/documents/users/victim"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        store(&server)
            .update_payment("x/../../users/victim", &PaymentUpdate::failed("x"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_id_with_fragment_is_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}%23other", DOC_PATH)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        store(&server)
            .update_payment("apt-1#other", &PaymentUpdate::failed("x"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dot_ids_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for id in [".", ".."] {
            let err = store(&server)
                .update_payment(id, &PaymentUpdate::failed("x"))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("Invalid appointment id"));
        }
    }

    #[tokio::test]
    async fn test_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(DOC_PATH))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = store(&server)
            .update_payment("apt-1", &PaymentUpdate::failed("x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No document to update"));
    }
}
