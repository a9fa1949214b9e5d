//! # Checkout Signature
//!
//! ePayco checks checkout parameters against a SHA-256 digest computed over the
//! sorted `key=value` pairs followed by the merchant's `p_key`. The byte layout
//! must match the gateway exactly.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Prefix of every invoice id
pub const INVOICE_PREFIX: &str = "VAQ";

/// Field carrying the digest inside a [`SignaturePayload`]
pub const SIGNATURE_FIELD: &str = "p_signature";

/// Compute the checkout signature over `fields` keyed with `secret`.
///
/// Keys are sorted byte-wise, so the result does not depend on the order the
/// pairs are supplied in.
pub fn generate_signature<'a, I>(fields: I, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    hex::encode(Sha256::digest(signing_string(fields, secret).as_bytes()))
}

/// The exact string that gets hashed: `k1=v1&k2=v2&...&p_key=<secret>`
pub fn signing_string<'a, I>(fields: I, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = fields.into_iter().collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}&p_key={}", joined, secret)
}

/// Invoice id for an appointment at the current millisecond
pub fn invoice_id(appointment_id: &str) -> String {
    invoice_id_at(appointment_id, Utc::now().timestamp_millis())
}

/// Invoice id for an appointment at a given epoch-millisecond timestamp
pub fn invoice_id_at(appointment_id: &str, epoch_millis: i64) -> String {
    format!("{}-{}-{}", INVOICE_PREFIX, appointment_id, epoch_millis)
}

/// Field set signed for a hosted checkout.
///
/// Every field is fixed before signing except `p_signature`, which starts empty
/// and is included in the signed string with that empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaturePayload {
    fields: BTreeMap<String, String>,
}

impl SignaturePayload {
    pub fn new() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(SIGNATURE_FIELD.to_string(), String::new());
        Self { fields }
    }

    /// Set a field. The signature field itself can only be set by [`Self::sign`].
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        if key != SIGNATURE_FIELD {
            self.fields.insert(key, value.into());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_signed(&self) -> bool {
        self.get(SIGNATURE_FIELD).map_or(false, |s| !s.is_empty())
    }

    /// Compute the digest over the current fields and store it in `p_signature`.
    /// Returns the digest.
    pub fn sign(&mut self, p_key: &str) -> String {
        self.fields.insert(SIGNATURE_FIELD.to_string(), String::new());
        let signature = generate_signature(
            self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            p_key,
        );
        self.fields
            .insert(SIGNATURE_FIELD.to_string(), signature.clone());
        signature
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for SignaturePayload {
    fn default() -> Self {
        Self::new()
    }
}
