//! Helpers over tool parameter schemas

use conduit_llm::ToolDefinition;
use serde_json::{Map, Value};

/// Merge several object schemas into one
///
/// Properties are unioned (a later schema wins on a name clash) and
/// `required` names are de-duplicated in first-seen order.
pub fn merge_tool_schemas(schemas: &[Value]) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    for schema in schemas {
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            properties.extend(props.iter().map(|(name, prop)| (name.clone(), prop.clone())));
        }

        for name in schema.get("required").and_then(Value::as_array).into_iter().flatten() {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Check arguments against a tool's parameter schema
///
/// Covers missing required parameters, parameters the schema does not
/// declare, and top-level JSON types. Not a full JSON Schema validator.
///
/// # Errors
///
/// Returns every problem found, one message each.
pub fn validate_tool_arguments(tool: &ToolDefinition, arguments: &Map<String, Value>) -> Result<(), Vec<String>> {
    let schema = &tool.parameters;
    let empty = Map::new();
    let properties = schema.get("properties").and_then(Value::as_object).unwrap_or(&empty);

    let mut errors = Vec::new();

    for name in schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        if !arguments.contains_key(name) {
            errors.push(format!("Missing required parameter: {name}"));
        }
    }

    for (name, value) in arguments {
        let Some(property) = properties.get(name) else {
            errors.push(format!("Unknown parameter: {name}"));
            continue;
        };

        if let Some(expected) = property.get("type").and_then(Value::as_str)
            && !matches_type(value, expected)
        {
            errors.push(format!("Invalid type for {name}: expected {expected}"));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Unknown type names are accepted
fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}
