//! Parse LLM output into a FieldMap

use crate::error::ExtractorError;
use coi_domain::{names, FieldMap, FieldValue};
use serde_json::{Map, Value};
use tracing::warn;

/// Parse an LLM JSON response into raw field values
///
/// The response must be a single JSON object. Nested objects are flattened
/// with a dot (`{"coverage_limit": {"general_liability": ..}}` becomes
/// `coverage_limit.general_liability`); nulls and empty strings are left out.
pub fn parse_llm_response(response: &str) -> Result<FieldMap, ExtractorError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| ExtractorError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let object = json
        .as_object()
        .ok_or_else(|| ExtractorError::InvalidFormat("Expected JSON object".to_string()))?;

    let mut fields = Vec::new();
    flatten(object, None, &mut fields);
    Ok(fields.into_iter().collect())
}

fn flatten(object: &Map<String, Value>, prefix: Option<&str>, out: &mut Vec<(String, FieldValue)>) {
    for (key, value) in object {
        let key = canonical_key(key);
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.to_string(),
        };
        match value {
            Value::Null => {}
            Value::Object(inner) => flatten(inner, Some(&name), out),
            other => match to_field_value(other) {
                Some(v) if !v.is_empty() => out.push((name, v)),
                Some(_) => {}
                None => warn!("Skipping field '{}': unsupported value {}", name, other),
            },
        }
    }
}

/// Accept the plural spelling models tend to use for the limits object
fn canonical_key(key: &str) -> &str {
    match key {
        "coverage_limits" => names::COVERAGE_LIMIT_PREFIX.trim_end_matches('.'),
        other => other,
    }
}

fn to_field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::text(s.trim())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(FieldValue::Integer(i)),
            None => Some(FieldValue::text(n.to_string())),
        },
        Value::Bool(b) => Some(FieldValue::text(b.to_string())),
        Value::Array(items) => {
            let items: Option<Vec<String>> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect();
            items.map(|items| FieldValue::List(items.into_iter().filter(|s| !s.is_empty()).collect()))
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Extract JSON from response, handling markdown code blocks
fn extract_json(response: &str) -> Result<String, ExtractorError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(ExtractorError::InvalidFormat("Empty code block".to_string()));
        }

        // Skip the opening fence line and a closing fence if present
        let end = if lines.last().is_some_and(|l| l.trim() == "```") {
            lines.len() - 1
        } else {
            lines.len()
        };
        Ok(lines[1..end].join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}
