//! Relay frame codec.
//!
//! Both directions carry the same JSON text frame:
//! `{"id": "<fieldId>", "value": <scalar>}`. There is no envelope, no
//! version field and no sequence number.

use crate::{RelayError, RelayResult};
use serde_json::Value;
use settings_cache::FieldUpdate;

/// Encode one field update as a relay text frame.
pub fn encode_frame(update: &FieldUpdate) -> RelayResult<String> {
    Ok(serde_json::to_string(update)?)
}

/// Decode one relay text frame.
///
/// The frame must be a JSON object with a string `id` and a scalar `value`
/// (string, number or boolean). Other keys are ignored.
pub fn decode_frame(text: &str) -> RelayResult<FieldUpdate> {
    let frame: Value = serde_json::from_str(text)
        .map_err(|e| RelayError::MalformedMessage(format!("invalid JSON: {}", e)))?;

    let Value::Object(mut fields) = frame else {
        return Err(RelayError::MalformedMessage(
            "frame is not a JSON object".to_string(),
        ));
    };

    let id = match fields.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        Some(Value::String(_)) => {
            return Err(RelayError::MalformedMessage("empty field id".to_string()))
        }
        Some(_) => {
            return Err(RelayError::MalformedMessage(
                "field id is not a string".to_string(),
            ))
        }
        None => return Err(RelayError::MalformedMessage("missing id".to_string())),
    };

    let value = match fields.remove("value") {
        Some(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_))) => value,
        Some(_) => {
            return Err(RelayError::MalformedMessage(format!(
                "value of '{}' is not a scalar",
                id
            )))
        }
        None => {
            return Err(RelayError::MalformedMessage(format!(
                "missing value for '{}'",
                id
            )))
        }
    };

    Ok(FieldUpdate { id, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn malformed(text: &str) -> bool {
        matches!(decode_frame(text), Err(RelayError::MalformedMessage(_)))
    }

    #[test]
    fn test_encode_frame_shape() {
        let frame = encode_frame(&FieldUpdate::new("backgroundColor", 16711680)).unwrap();
        assert_eq!(frame, r#"{"id":"backgroundColor","value":16711680}"#);
    }

    #[test]
    fn test_decode_scalars() {
        let update = decode_frame(r#"{"id":"backgroundColor","value":16711680}"#).unwrap();
        assert_eq!(update, FieldUpdate::new("backgroundColor", 16711680));

        let update = decode_frame(r#"{"id":"secondsHandEnabled","value":true}"#).unwrap();
        assert_eq!(update.value, json!(true));

        let update = decode_frame(r#"{"id":"label","value":"hello"}"#).unwrap();
        assert_eq!(update.value, json!("hello"));

        let update = decode_frame(r#"{"id":"ratio","value":0.5}"#).unwrap();
        assert_eq!(update.value, json!(0.5));
    }

    #[test]
    fn test_decode_ignores_extra_keys() {
        let update = decode_frame(r#"{"id":"x","value":1,"sent":"now"}"#).unwrap();
        assert_eq!(update, FieldUpdate::new("x", 1));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(malformed("not json"));
        assert!(malformed("[1,2]"));
        assert!(malformed("42"));
        assert!(malformed(r#"{"value":1}"#));
        assert!(malformed(r#"{"id":"","value":1}"#));
        assert!(malformed(r#"{"id":7,"value":1}"#));
        assert!(malformed(r#"{"id":"x"}"#));
        assert!(malformed(r#"{"id":"x","value":null}"#));
        assert!(malformed(r#"{"id":"x","value":[1]}"#));
        assert!(malformed(r#"{"id":"x","value":{"r":1}}"#));
    }
}
