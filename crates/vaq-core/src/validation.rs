//! # Request Validation
//!
//! Checks untyped request bodies field by field, in a fixed order, and stops at
//! the first failure. The messages are matched on by the mobile client, so they
//! stay exactly as they are. Once a body passes, it is decoded into its typed form.

use crate::error::{PaymentError, PaymentResult};
use crate::request::{ChargeRequest, CheckoutRequest};
use serde_json::Value;

/// One required field and the shape it must have
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Non-empty string
    Text(&'static str),
    /// Number strictly greater than zero
    PositiveNumber(&'static str),
    /// JSON object (nested fields are checked by later rules)
    Object(&'static str),
}

impl Rule {
    fn path(&self) -> &'static str {
        match self {
            Rule::Text(p) | Rule::PositiveNumber(p) | Rule::Object(p) => p,
        }
    }

    fn check(&self, body: &Value) -> Result<(), String> {
        let value = lookup(body, self.path());
        let ok = match self {
            Rule::Text(_) => matches!(value, Some(Value::String(s)) if !s.is_empty()),
            Rule::PositiveNumber(_) => value
                .and_then(Value::as_f64)
                .map(|n| n > 0.0)
                .unwrap_or(false),
            // Arrays pass here and fail on their first nested field instead
            Rule::Object(_) => matches!(value, Some(Value::Object(_) | Value::Array(_))),
        };

        if ok {
            return Ok(());
        }

        let expectation = match self {
            Rule::Text(_) => "a string",
            Rule::PositiveNumber(_) => "a positive number",
            Rule::Object(_) => "an object",
        };
        Err(format!(
            "{} is required and must be {}",
            self.path(),
            expectation
        ))
    }
}

const CHECKOUT_RULES: &[Rule] = &[
    Rule::Text("appointmentId"),
    Rule::PositiveNumber("amountCOP"),
    Rule::Text("description"),
    Rule::Object("customer"),
    Rule::Text("customer.uid"),
    Rule::Text("customer.name"),
    Rule::Text("customer.email"),
];

const CHARGE_RULES: &[Rule] = &[
    Rule::Text("appointmentId"),
    Rule::Object("customer"),
    Rule::Text("customer.name"),
    Rule::Text("customer.last_name"),
    Rule::Text("customer.email"),
    Rule::Text("customer.doc_type"),
    Rule::Text("customer.doc_number"),
    Rule::Object("card"),
    Rule::Text("card.number"),
    Rule::Text("card.exp_month"),
    Rule::Text("card.exp_year"),
    Rule::Text("card.cvc"),
    Rule::PositiveNumber("amount"),
    Rule::Text("description"),
];

/// Walk a dotted path through nested objects
fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(body, |current, segment| current.as_object()?.get(segment))
}

fn run_rules(body: &Value, rules: &[Rule]) -> PaymentResult<()> {
    if body.is_null() {
        return Err(PaymentError::Validation("Request body is required".to_string()));
    }

    for rule in rules {
        rule.check(body).map_err(PaymentError::Validation)?;
    }
    Ok(())
}

/// Validate and decode a `start-checkout` body
pub fn validate_checkout(body: &Value) -> PaymentResult<CheckoutRequest> {
    run_rules(body, CHECKOUT_RULES)?;
    serde_json::from_value(body.clone()).map_err(|e| PaymentError::Validation(e.to_string()))
}

/// Validate and decode a `charge-appointment` body
pub fn validate_charge(body: &Value) -> PaymentResult<ChargeRequest> {
    run_rules(body, CHARGE_RULES)?;
    serde_json::from_value(body.clone()).map_err(|e| PaymentError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn checkout_body() -> Value {
        json!({
            "appointmentId": "b3c36740-b21f-4954-86f0-5e5ea7249e73",
            "amountCOP": 459000,
            "description": "Cita médica",
            "customer": { "uid": "user-1", "name": "Ana", "email": "ana@example.com" }
        })
    }

    fn charge_body() -> Value {
        json!({
            "appointmentId": "test-appointment-123",
            "customer": {
                "name": "Test",
                "last_name": "User",
                "email": "test@example.com",
                "doc_type": "CC",
                "doc_number": "1234567890",
                "phone": "3001234567"
            },
            "card": {
                "number": "4575623182290326",
                "exp_month": "12",
                "exp_year": "2025",
                "cvc": "123"
            },
            "amount": 10000,
            "description": "Test Payment"
        })
    }

    fn message(err: PaymentError) -> String {
        match err {
            PaymentError::Validation(m) => m,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_accepts_valid_checkout() {
        let request = validate_checkout(&checkout_body()).unwrap();
        assert_eq!(request.customer.uid, "user-1");
        assert_eq!(request.amount_cop, 459000.0);
    }

    #[test]
    fn test_missing_amount_names_field() {
        let mut body = checkout_body();
        body.as_object_mut().unwrap().remove("amountCOP");

        assert_eq!(
            message(validate_checkout(&body).unwrap_err()),
            "amountCOP is required and must be a positive number"
        );
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let mut body = checkout_body();
        body["amountCOP"] = json!(0);
        assert!(validate_checkout(&body).is_err());

        body["amountCOP"] = json!(-5);
        assert!(validate_checkout(&body).is_err());

        body["amountCOP"] = json!("459000");
        assert!(validate_checkout(&body).is_err());
    }

    #[test]
    fn test_null_body() {
        assert_eq!(
            message(validate_checkout(&Value::Null).unwrap_err()),
            "Request body is required"
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let body = json!({ "amountCOP": -1, "customer": "nope" });
        assert_eq!(
            message(validate_checkout(&body).unwrap_err()),
            "appointmentId is required and must be a string"
        );
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let mut body = checkout_body();
        body["customer"]["email"] = json!("");
        assert_eq!(
            message(validate_checkout(&body).unwrap_err()),
            "customer.email is required and must be a string"
        );
    }

    #[test]
    fn test_customer_must_be_object() {
        let mut body = checkout_body();
        body["customer"] = json!("user-1");
        assert_eq!(
            message(validate_checkout(&body).unwrap_err()),
            "customer is required and must be an object"
        );
    }

    #[test]
    fn test_array_customer_fails_on_nested_field() {
        let mut body = checkout_body();
        body["customer"] = json!(["user-1"]);
        assert_eq!(
            message(validate_checkout(&body).unwrap_err()),
            "customer.uid is required and must be a string"
        );

        let mut body = charge_body();
        body["card"] = json!([]);
        assert_eq!(
            message(validate_charge(&body).unwrap_err()),
            "card.number is required and must be a string"
        );
    }

    #[test]
    fn test_accepts_valid_charge() {
        let request = validate_charge(&charge_body()).unwrap();
        assert_eq!(request.card.last4(), "0326");
        assert_eq!(request.customer.city, None);
    }

    #[test]
    fn test_numeric_cvc_is_rejected() {
        let mut body = charge_body();
        body["card"]["cvc"] = json!(123);
        assert_eq!(
            message(validate_charge(&body).unwrap_err()),
            "card.cvc is required and must be a string"
        );
    }

    #[test]
    fn test_numeric_phone_is_accepted() {
        let mut body = charge_body();
        body["customer"]["phone"] = json!(3001234567u64);
        body["customer"]["city"] = json!(null);

        let request = validate_charge(&body).unwrap();
        assert_eq!(request.customer.phone_or_default(), "3001234567");
        assert_eq!(request.customer.city_or_default(), "Bogotá");
    }

    #[test]
    fn test_charge_field_order() {
        let mut body = charge_body();
        body["customer"]["doc_type"] = json!(null);
        body["amount"] = json!(0);
        assert_eq!(
            message(validate_charge(&body).unwrap_err()),
            "customer.doc_type is required and must be a string"
        );
    }
}
