//! Flat key/value views of structured values.
//!
//! Query parameters and form bodies both need a value to be a flat map of
//! strings. Any `Serialize` value qualifies as long as it serializes to an
//! object whose fields are scalars; nested objects and arrays are rejected.
//! Numbers and booleans are rendered as text, `null` fields are left out.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::Failure;

pub fn flatten<T: Serialize + ?Sized>(value: &T) -> Result<BTreeMap<String, String>, Failure> {
    let value = serde_json::to_value(value).map_err(|e| Failure::Encode(e.to_string()))?;
    flatten_value(&value)
}

pub fn flatten_value(value: &Value) -> Result<BTreeMap<String, String>, Failure> {
    let Value::Object(fields) = value else {
        return Err(Failure::Encode(format!(
            "expected a flat object of fields, got {value}"
        )));
    };

    let mut flat = BTreeMap::new();
    for (key, field) in fields {
        let text = match field {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(Failure::Encode(format!("field {key} is not a flat value")));
            }
        };
        flat.insert(key.clone(), text);
    }
    Ok(flat)
}

/// `application/x-www-form-urlencoded` body for a flat value.
pub fn encode(value: &Value) -> Result<Vec<u8>, Failure> {
    let flat = flatten_value(value)?;
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&flat)
        .finish();
    Ok(body.into_bytes())
}
