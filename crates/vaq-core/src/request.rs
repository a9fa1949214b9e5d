//! # Request Types
//!
//! Typed bodies accepted by the checkout and charge endpoints.
//! Field names follow the mobile client's wire format.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Currency every VAQ transaction is priced in
pub const CURRENCY_COP: &str = "COP";

/// Country sent to the gateway with every checkout
pub const COUNTRY_CO: &str = "CO";

/// Fallbacks used when the app leaves optional contact fields out
pub const DEFAULT_CITY: &str = "Bogotá";
pub const DEFAULT_ADDRESS: &str = "N/A";
pub const DEFAULT_PHONE: &str = "3000000000";

/// Customer identity attached to a hosted checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutCustomer {
    /// Firebase Auth uid of the app user
    pub uid: String,
    pub name: String,
    pub email: String,
}

/// Body of `start-checkout`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(rename = "appointmentId")]
    pub appointment_id: String,

    /// Amount in Colombian pesos
    #[serde(rename = "amountCOP")]
    pub amount_cop: f64,

    pub description: String,

    pub customer: CheckoutCustomer,
}

impl CheckoutRequest {
    /// Amount rendered the way the gateway expects it
    pub fn amount_string(&self) -> String {
        format_amount(self.amount_cop)
    }
}

/// Cardholder data sent with a direct charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeCustomer {
    pub name: String,
    pub last_name: String,
    pub email: String,
    /// Identity document type (CC, CE, NIT, ...)
    pub doc_type: String,
    pub doc_number: String,
    #[serde(
        default,
        deserialize_with = "loose_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    #[serde(
        default,
        deserialize_with = "loose_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
}

/// Optional contact field as the app sends it: strings pass through, numbers
/// and `true` are stringified, falsy or structured values count as absent.
fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f == 0.0 => None,
            Some(f) if n.is_f64() => Some(format_amount(f)),
            _ => Some(n.to_string()),
        },
        Some(Value::Bool(true)) => Some("true".to_string()),
        _ => None,
    })
}

impl ChargeCustomer {
    pub fn city_or_default(&self) -> &str {
        non_empty_or(self.city.as_deref(), DEFAULT_CITY)
    }

    pub fn address_or_default(&self) -> &str {
        non_empty_or(self.address.as_deref(), DEFAULT_ADDRESS)
    }

    pub fn phone_or_default(&self) -> &str {
        non_empty_or(self.phone.as_deref(), DEFAULT_PHONE)
    }
}

fn non_empty_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => fallback,
    }
}

/// Raw card data. Only ever forwarded to the gateway's tokenizer.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
}

impl CardDetails {
    /// Last four digits, for logs
    pub fn last4(&self) -> &str {
        let len = self.number.len();
        self.number.get(len.saturating_sub(4)..).unwrap_or("")
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{}", self.last4()))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}

/// Body of `charge-appointment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    #[serde(rename = "appointmentId")]
    pub appointment_id: String,
    pub customer: ChargeCustomer,
    pub card: CardDetails,
    pub amount: f64,
    pub description: String,
}

impl ChargeRequest {
    pub fn amount_string(&self) -> String {
        format_amount(self.amount)
    }
}

/// Render an amount the way a JSON number prints.
///
/// Integral values drop the fractional part (`459000`), anything else keeps
/// its shortest decimal form (`1.5`).
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}
