//! Canonical JSON and content hashing
//!
//! Canonical form sorts object keys and drops insignificant whitespace, so
//! two equal values always hash to the same digest.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Render a JSON value with sorted keys and no whitespace
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => value.to_string(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(map) => {
            let sorted: BTreeMap<&String, String> =
                map.iter().map(|(k, v)| (k, to_canonical_json(v))).collect();
            let items: Vec<String> = sorted
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

/// blake3 digest of a string, hex encoded
pub fn hash_str(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// blake3 digest of the canonical JSON form of a serializable value
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    Ok(hash_str(&to_canonical_json(&value)))
}
