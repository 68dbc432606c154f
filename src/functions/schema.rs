//! Argument validation against a descriptor's JSON Schema
//!
//! Only the subset the weather functions advertise is checked: `required`,
//! top-level property `type`, and `additionalProperties: false`.

use serde_json::{Map, Value};

/// Check `arguments` against `schema`, returning a reason on mismatch
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<(), String> {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !arguments.contains_key(field) {
                return Err(format!("missing required argument '{field}'"));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in arguments {
        match properties.and_then(|p| p.get(key)) {
            Some(prop) => {
                if let Some(expected) = prop.get("type") {
                    if !type_matches(expected, value) {
                        return Err(format!(
                            "argument '{key}' should be {}, got {}",
                            describe_type(expected),
                            json_type(value)
                        ));
                    }
                }
            }
            None if closed => return Err(format!("unexpected argument '{key}'")),
            None => {}
        }
    }

    Ok(())
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(t) => single_type_matches(t, value),
        // Union types: ["string", "null"]
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| single_type_matches(t, value)),
        _ => true,
    }
}

fn single_type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(t) => t.clone(),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
