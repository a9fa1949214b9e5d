//! # ePayco Webhook Handling
//!
//! ePayco reports the outcome of a hosted checkout by calling back the
//! response and confirmation URLs, as GET or POST, with field names that differ
//! between sandbox and production. This module normalizes those parameters and
//! decides which deep link sends the user back into the app.
//!
//! Signatures on incoming webhooks are not verified.

use serde_json::{Map, Value};
use tracing::debug;
use url::form_urlencoded;

/// Parameters of a gateway callback, query and body merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    params: Map<String, Value>,
}

impl CallbackParams {
    /// Merge query-string pairs with body fields. Body fields win.
    pub fn merge<I>(query: I, body: Map<String, Value>) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params: Map<String, Value> = query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        params.extend(body);
        Self { params }
    }

    /// Decode a callback body: a JSON object, or form-encoded pairs otherwise
    pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Map<String, Value> {
        if body.is_empty() {
            return Map::new();
        }

        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("json"))
            .unwrap_or(false);

        if is_json {
            return match serde_json::from_slice::<Value>(body) {
                Ok(Value::Object(map)) => map,
                _ => {
                    debug!("Ignoring non-object JSON callback body");
                    Map::new()
                }
            };
        }

        form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.params
    }

    /// First truthy value among `keys`
    fn first_truthy(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.params.get(*k))
            .find(|v| is_truthy(v))
    }

    /// First present, non-null value among `keys`, lowercased text
    fn first_present_lower(&self, keys: &[&str]) -> String {
        keys.iter()
            .filter_map(|k| self.params.get(*k))
            .find(|v| !v.is_null())
            .map(|v| js_string(v).to_lowercase())
            .unwrap_or_default()
    }

    /// Gateway payment reference, or empty
    pub fn ref_payco(&self) -> String {
        self.first_truthy(&["ref_payco", "x_ref_payco", "refPayco"])
            .map(js_string)
            .unwrap_or_default()
    }

    /// Response code (`x_cod_response`, else `code`), lowercased
    pub fn response_code(&self) -> String {
        self.first_present_lower(&["x_cod_response", "code"])
    }

    /// Response state text (`x_response`, else `state`), lowercased
    pub fn response_state(&self) -> String {
        self.first_present_lower(&["x_response", "state"])
    }

    /// Whether the gateway reported an approved transaction.
    ///
    /// Accepts any of the spellings seen from ePayco: code `1`, states
    /// containing `acept`/`aprob`, `accepted`/`approved`, or `success=true`.
    pub fn outcome(&self) -> CallbackOutcome {
        let code = self.response_code();
        let state = self.response_state();

        let success_flag = match self.params.get("success") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        };

        let approved = code == "1"
            || state.contains("acept")
            || state.contains("aprob")
            || state == "accepted"
            || state == "approved"
            || success_flag;

        if approved {
            CallbackOutcome::Success
        } else {
            CallbackOutcome::Failure
        }
    }
}

/// Where a payment callback sends the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success,
    Failure,
}

impl CallbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackOutcome::Success => "success",
            CallbackOutcome::Failure => "failure",
        }
    }
}

/// Builds `<scheme>://payment/<outcome>?refPayco=...` links into the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    scheme: String,
}

impl DeepLink {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn url(&self, outcome: CallbackOutcome, ref_payco: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("refPayco", ref_payco)
            .finish();
        format!("{}://payment/{}?{}", self.scheme, outcome.as_str(), query)
    }
}

impl Default for DeepLink {
    fn default() -> Self {
        Self::new("vaq")
    }
}

/// Minimal page that bounces the browser to the app's deep link
pub fn redirect_page(deep_link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Redirigiendo…</title></head>
<body>
<script>
  (function(){{
    try {{ window.location.href = '{}'; }} catch(e) {{}}
  }})();
</script>
<p>Regresando a la app…</p>
</body></html>"#,
        deep_link
    )
}

/// JavaScript-style truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text form of a JSON value, strings unquoted
fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
