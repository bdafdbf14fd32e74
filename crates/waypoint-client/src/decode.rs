//! Typed decoding of successful JSON payloads.

use crate::error::ClientError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a payload declared as a single structured value.
pub(crate) fn decode_item<T: DeserializeOwned>(payload: Value) -> Result<T, ClientError> {
    if !payload.is_object() {
        return Err(ClientError::Decode(format!(
            "expected a JSON object, got {}",
            json_kind(&payload)
        )));
    }
    serde_json::from_value(payload).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Decode a payload declared as an ordered list of structured values.
pub(crate) fn decode_list<T: DeserializeOwned>(payload: Value) -> Result<Vec<T>, ClientError> {
    let Value::Array(elements) = payload else {
        return Err(ClientError::Decode(format!(
            "expected a JSON array, got {}",
            json_kind(&payload)
        )));
    };
    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            serde_json::from_value(element)
                .map_err(|e| ClientError::Decode(format!("element {index}: {e}")))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a JSON array",
        Value::Object(_) => "a JSON object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    #[test]
    fn test_list_preserves_order() {
        let items: Vec<Item> = decode_list(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(items, vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn test_array_against_item_shape_is_decode_error() {
        let err = decode_item::<Item>(json!([{"id": 1}, {"id": 2}])).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_object_against_list_shape_is_decode_error() {
        let err = decode_list::<Item>(json!({"id": 1})).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_item_decodes_by_field_name() {
        let item: Item = decode_item(json!({"id": 9, "ignored": "x"})).unwrap();
        assert_eq!(item, Item { id: 9 });
    }

    #[test]
    fn test_bad_element_reports_index() {
        let err = decode_list::<Item>(json!([{"id": 1}, {"id": "two"}])).unwrap_err();
        let ClientError::Decode(msg) = err else {
            panic!("expected decode error");
        };
        assert!(msg.contains("element 1"));
    }
}
