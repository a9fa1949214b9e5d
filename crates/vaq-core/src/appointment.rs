//! # Appointment Payment State
//!
//! The payment fields written onto an appointment document, and the store seam
//! used to write them.

use crate::error::{PaymentError, PaymentResult};
use crate::gateway::ChargeReceipt;
use crate::request::CURRENCY_COP;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Value of the `paymentStatus` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

/// Summary of a captured card payment (`paymentData`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    pub amount: f64,
    pub currency: String,
    pub method: String,
    /// ISO-8601, millisecond precision
    pub processed_at: String,
}

impl PaymentDetail {
    pub fn card(amount: f64, processed_at: DateTime<Utc>) -> Self {
        Self {
            amount,
            currency: CURRENCY_COP.to_string(),
            method: "card".to_string(),
            processed_at: processed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// A single write against an appointment document
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentUpdate {
    Paid {
        receipt: ChargeReceipt,
        detail: PaymentDetail,
    },
    Failed {
        error: String,
    },
}

impl PaymentUpdate {
    pub fn failed(error: impl Into<String>) -> Self {
        PaymentUpdate::Failed {
            error: error.into(),
        }
    }

    pub fn status(&self) -> PaymentStatus {
        match self {
            PaymentUpdate::Paid { .. } => PaymentStatus::Paid,
            PaymentUpdate::Failed { .. } => PaymentStatus::Failed,
        }
    }
}

/// Store holding appointment documents.
///
/// Updates merge into an existing document; implementations must not create
/// appointments that do not exist yet.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Apply a payment update and stamp `lastUpdatedAt`.
    async fn update_payment(&self, appointment_id: &str, update: &PaymentUpdate)
        -> PaymentResult<()>;

    /// Name of the backing store (for logging)
    fn store_name(&self) -> &'static str;
}

/// Type alias for a shared store handle
pub type BoxedAppointmentStore = Arc<dyn AppointmentStore>;

/// Payment fields of one appointment as last written
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPayment {
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_data: Option<PaymentDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_error: Option<String>,
    pub last_updated_at: DateTime<Utc>,
}

/// In-process store for local development and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryAppointmentStore {
    appointments: Arc<RwLock<HashMap<String, Option<AppointmentPayment>>>>,
    /// When false, updates to unknown appointments are accepted and create them
    strict: bool,
}

impl MemoryAppointmentStore {
    /// Store that accepts updates for any appointment id
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that only accepts updates for appointments added with `insert`
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Register an appointment with no payment state
    pub async fn insert(&self, appointment_id: impl Into<String>) {
        self.appointments
            .write()
            .await
            .insert(appointment_id.into(), None);
    }

    /// Current payment fields of an appointment
    pub async fn get(&self, appointment_id: &str) -> Option<AppointmentPayment> {
        self.appointments
            .read()
            .await
            .get(appointment_id)
            .cloned()
            .flatten()
    }
}

#[async_trait]
impl AppointmentStore for MemoryAppointmentStore {
    async fn update_payment(
        &self,
        appointment_id: &str,
        update: &PaymentUpdate,
    ) -> PaymentResult<()> {
        let mut appointments = self.appointments.write().await;

        if self.strict && !appointments.contains_key(appointment_id) {
            return Err(PaymentError::Store(format!(
                "No document to update: appointments/{}",
                appointment_id
            )));
        }

        let slot = appointments.entry(appointment_id.to_string()).or_default();
        let now = Utc::now();

        let mut record = slot.take().unwrap_or(AppointmentPayment {
            payment_status: update.status(),
            payment_ref: None,
            transaction_id: None,
            payment_data: None,
            payment_error: None,
            last_updated_at: now,
        });

        record.payment_status = update.status();
        record.last_updated_at = now;
        match update {
            PaymentUpdate::Paid { receipt, detail } => {
                record.payment_ref = Some(receipt.ref_payco.clone());
                record.transaction_id = Some(receipt.transaction_id.clone());
                record.payment_data = Some(detail.clone());
            }
            PaymentUpdate::Failed { error } => {
                record.payment_error = Some(error.clone());
            }
        }

        *slot = Some(record);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid() -> PaymentUpdate {
        PaymentUpdate::Paid {
            receipt: ChargeReceipt {
                ref_payco: "123456".into(),
                transaction_id: "tx-1".into(),
            },
            detail: PaymentDetail::card(10000.0, Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_paid_update() {
        let store = MemoryAppointmentStore::new();
        store.update_payment("apt-1", &paid()).await.unwrap();

        let record = store.get("apt-1").await.unwrap();
        assert_eq!(record.payment_status, PaymentStatus::Paid);
        assert_eq!(record.payment_ref.as_deref(), Some("123456"));
        assert_eq!(record.payment_data.unwrap().currency, "COP");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_earlier_fields() {
        let store = MemoryAppointmentStore::new();
        store.update_payment("apt-1", &paid()).await.unwrap();
        store
            .update_payment("apt-1", &PaymentUpdate::failed("Payment failed"))
            .await
            .unwrap();

        let record = store.get("apt-1").await.unwrap();
        assert_eq!(record.payment_status, PaymentStatus::Failed);
        assert_eq!(record.payment_error.as_deref(), Some("Payment failed"));
        assert_eq!(record.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_strict_store_rejects_unknown_appointment() {
        let store = MemoryAppointmentStore::strict();
        let result = store
            .update_payment("missing", &PaymentUpdate::failed("x"))
            .await;
        assert!(matches!(result, Err(PaymentError::Store(_))));

        store.insert("known").await;
        assert!(store.get("known").await.is_none());
        store
            .update_payment("known", &PaymentUpdate::failed("x"))
            .await
            .unwrap();
        assert!(store.get("known").await.is_some());
    }

    #[test]
    fn test_processed_at_format() {
        let at = DateTime::parse_from_rfc3339("2025-03-01T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let detail = PaymentDetail::card(5.0, at);
        assert_eq!(detail.processed_at, "2025-03-01T10:20:30.123Z");
    }
}
