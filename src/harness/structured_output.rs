use serde_json::Value;

/// Coerces a model reply into a usable JSON value. Objects pass through;
/// a reply delivered as a string that itself parses as JSON is unwrapped.
pub fn resolve_structured_output(reply: Value) -> Value {
    if let Value::String(raw) = &reply {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            if let Ok(parsed) = serde_json::from_str::<Value>(trimmed) {
                return parsed;
            }
        }
    }
    reply
}

/// Validates `value` against `schema`, returning instance-path-prefixed
/// violation messages. A schema that fails to compile is reported as a
/// single violation.
pub fn schema_violations(value: &Value, schema: &Value) -> Vec<String> {
    let compiled = match jsonschema::JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(error) => return vec![format!("schema failed to compile: {error}")],
    };

    compiled
        .validate(value)
        .err()
        .map(|errors| {
            errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    if path.is_empty() {
                        error.to_string()
                    } else {
                        format!("{}: {}", path, error)
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

/// Non-empty trimmed string at `field`, if the reply carries one.
pub fn string_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(|field_value| field_value.as_str())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
