//! Field decoding for display.
//!
//! The store carries every field value as standard base64 text. These helpers
//! decode values for humans and fall back to the raw text when a value is not
//! valid base64, so a bad value never hides the rest of the object.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::fmt;

/// A field value prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Value decoded successfully (lossy UTF-8)
    Decoded(String),
    /// Value was not valid base64; raw text shown instead
    Raw(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decoded(value) => f.write_str(value),
            Self::Raw(value) => write!(f, "{value} (raw, could not base64 decode)"),
        }
    }
}

/// One key/value pair ready to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedField {
    /// Field key
    pub key: String,
    /// Decoded or raw value
    pub value: FieldValue,
}

impl fmt::Display for RenderedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// Decode one encoded field value.
#[must_use]
pub fn decode_field(value: &[u8]) -> FieldValue {
    match STANDARD.decode(value) {
        Ok(bytes) => FieldValue::Decoded(String::from_utf8_lossy(&bytes).into_owned()),
        Err(_) => FieldValue::Raw(String::from_utf8_lossy(value).into_owned()),
    }
}

/// Decode every field, keys in sorted order.
#[must_use]
pub fn render_fields(fields: &BTreeMap<String, Vec<u8>>) -> Vec<RenderedField> {
    fields
        .iter()
        .map(|(key, value)| RenderedField {
            key: key.clone(),
            value: decode_field(value),
        })
        .collect()
}
