//! Decoding of saved widget settings

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use log::trace;

use crate::errors::{Result, property_decoding_error};
use crate::value::{PyValue, parse_literal, unpickle};

use super::model::PropertyRecord;

/// Encoding named by the `format` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFormat {
    Literal,
    Pickle,
    Json,
}

impl PropertyFormat {
    /// Missing and unrecognised formats are treated as literal text
    pub fn from_attribute(format: Option<&str>) -> Self {
        match format {
            Some("pickle") => PropertyFormat::Pickle,
            Some("json") => PropertyFormat::Json,
            _ => PropertyFormat::Literal,
        }
    }
}

/// Settings of one node
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Literal text, returned as saved
    Literal(String),
    /// An already decoded object graph
    Object(PyValue),
}

impl PropertyValue {
    /// Structured view of the settings
    ///
    /// Literal text is parsed here; text that is not a valid literal gives
    /// `None`.
    pub fn into_structured(self) -> Option<PyValue> {
        match self {
            PropertyValue::Object(value) => Some(value),
            PropertyValue::Literal(text) => match parse_literal(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    trace!("Settings text is not a literal: {e}");
                    None
                }
            },
        }
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            PropertyValue::Literal(text) => Some(text),
            PropertyValue::Object(_) => None,
        }
    }
}

/// Decodes a saved settings record
pub fn decode(record: &PropertyRecord) -> Result<PropertyValue> {
    let node_id = record.node_id.as_deref().unwrap_or_default();
    let text = match record.text.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => return Err(property_decoding_error(node_id, "no saved settings text")),
    };

    match PropertyFormat::from_attribute(record.format.as_deref()) {
        PropertyFormat::Literal => Ok(PropertyValue::Literal(text.to_string())),
        PropertyFormat::Pickle => {
            let bytes = decode_base64(text)
                .map_err(|e| property_decoding_error(node_id, &format!("bad base64: {e}")))?;
            let value = unpickle(&bytes)
                .map_err(|e| property_decoding_error(node_id, &e.to_string()))?;
            Ok(PropertyValue::Object(value))
        }
        PropertyFormat::Json => {
            let json: serde_json::Value = serde_json::from_str(text)
                .map_err(|e| property_decoding_error(node_id, &format!("bad JSON: {e}")))?;
            Ok(PropertyValue::Object(PyValue::from(json)))
        }
    }
}

/// Accepts missing or extra padding and non-zero trailing bits
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Lenient base64: characters outside the alphabet are dropped before decoding
fn decode_base64(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        .collect();
    LENIENT_BASE64.decode(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(format: Option<&str>, text: Option<&str>) -> PropertyRecord {
        PropertyRecord {
            node_id: Some("3".to_string()),
            format: format.map(str::to_string),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn test_literal_is_returned_raw() {
        let value = decode(&record(None, Some("{'sampling_type': 0}"))).unwrap();
        assert_eq!(value.as_literal(), Some("{'sampling_type': 0}"));

        let value = decode(&record(Some("unknown"), Some("not parsed"))).unwrap();
        assert_eq!(value.as_literal(), Some("not parsed"));
    }

    #[test]
    fn test_structured_literal() {
        let value = decode(&record(Some("literal"), Some("{'sampleSizePercentage': 80}")))
            .unwrap()
            .into_structured()
            .unwrap();
        assert_eq!(value.get("sampleSizePercentage"), Some(&PyValue::Int(80)));

        let garbage = decode(&record(None, Some("this is not python"))).unwrap();
        assert_eq!(garbage.into_structured(), None);
    }

    #[test]
    fn test_pickle_with_line_breaks() {
        // {'k': 1} at protocol 2, wrapped the way the file writer wraps it
        let value = decode(&record(Some("pickle"), Some("gAJ9cQBYAQAAAGtxAUsB\n  cy4=\n"))).unwrap();
        match value {
            PropertyValue::Object(value) => assert_eq!(value.get("k"), Some(&PyValue::Int(1))),
            other => panic!("expected decoded object, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_padding_and_trailing_bits_are_tolerated() {
        assert_eq!(decode_base64("YQ==").unwrap(), b"a");
        assert_eq!(decode_base64("YQ").unwrap(), b"a");
        assert_eq!(decode_base64("YR==").unwrap(), b"a");

        // {'k': 1} at protocol 2 with its padding stripped
        let value = decode(&record(Some("pickle"), Some("gAJ9cQBYAQAAAGtxAUsBcy4"))).unwrap();
        assert_eq!(
            value.into_structured().and_then(|v| v.get("k").cloned()),
            Some(PyValue::Int(1))
        );
    }

    #[test]
    fn test_json_format() {
        let value = decode(&record(Some("json"), Some(r#"{"score_table": {"CA": 0.9}}"#)))
            .unwrap()
            .into_structured()
            .unwrap();
        assert_eq!(value.get_path(&["score_table", "CA"]), Some(&PyValue::Float(0.9)));
    }

    #[test]
    fn test_failures_are_errors() {
        assert!(decode(&record(Some("pickle"), Some("@@@"))).is_err());
        assert!(decode(&record(Some("pickle"), Some("bm90IGEgcGlja2xl"))).is_err());
        assert!(decode(&record(Some("json"), Some("{"))).is_err());
        assert!(decode(&record(None, None)).is_err());
        assert!(decode(&record(None, Some(""))).is_err());
    }
}
