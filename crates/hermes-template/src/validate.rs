//! Checking tool calls against the tool definitions they target.
//!
//! A call passes when its arguments are valid JSON, a tool with the same
//! name exists, and the arguments satisfy that tool's parameter schema. Schema
//! checks (types, enums, required properties) are delegated to `jsonschema`.
//! Parameter maps that are not valid JSON Schema skip the schema check.
//!
//! [`validate_json_data`] covers JSON mode, where the model answers with a
//! JSON document (or a list of them) instead of tool calls.

use serde_json::Value;
use tracing::{debug, info, trace};

use crate::error::ValidationError;
use crate::{ToolCall, ToolDef};

/// Validate one call against the available tools.
///
/// # Example
///
/// ```
/// use hermes_template::validate::validate_function_call;
/// use hermes_template::{ToolCall, ToolDef, ValidationError};
/// use serde_json::json;
///
/// let tools = vec![ToolDef::new(
///     "get_stock_price",
///     "Latest price for a ticker",
///     json!({
///         "type": "object",
///         "properties": {"symbol": {"type": "string"}},
///         "required": ["symbol"]
///     }),
/// )];
///
/// let ok = ToolCall::new("get_stock_price", r#"{"symbol": "TSLA"}"#);
/// assert!(validate_function_call(&ok, &tools).is_ok());
///
/// let missing = ToolCall::new("get_stock_price", "{}");
/// assert!(matches!(
///     validate_function_call(&missing, &tools),
///     Err(ValidationError::SchemaViolation { .. })
/// ));
/// ```
pub fn validate_function_call(call: &ToolCall, tools: &[ToolDef]) -> Result<(), ValidationError> {
    let name = call.name();
    let arguments: Value =
        serde_json::from_str(call.arguments()).map_err(|e| ValidationError::InvalidArguments {
            name: name.to_string(),
            message: e.to_string(),
        })?;

    let tool = tools
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| ValidationError::UnknownFunction(name.to_string()))?;

    let validator = match jsonschema::validator_for(&tool.function.parameters) {
        Ok(v) => v,
        Err(e) => {
            debug!("skipping schema check for '{name}': parameters are not a usable schema ({e})");
            return Ok(());
        }
    };

    let errors: Vec<String> = validator
        .iter_errors(&arguments)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        trace!("tool call '{name}' passed validation");
        Ok(())
    } else {
        Err(ValidationError::SchemaViolation {
            name: name.to_string(),
            errors,
        })
    }
}

/// Validate every call, returning the failures paired with the index of the
/// offending call. An empty result means all calls passed.
pub fn validate_function_calls(
    calls: &[ToolCall],
    tools: &[ToolDef],
) -> Vec<(usize, ValidationError)> {
    let failures: Vec<(usize, ValidationError)> = calls
        .iter()
        .enumerate()
        .filter_map(|(i, call)| validate_function_call(call, tools).err().map(|e| (i, e)))
        .collect();
    debug!(
        "validated {} tool call(s): {} failed",
        calls.len(),
        failures.len()
    );
    failures
}

/// True if every key in `expected` appears in the call's arguments with an
/// equal value. Extra arguments are ignored. Unparseable arguments never
/// match.
pub fn arguments_match(call: &ToolCall, expected: &serde_json::Map<String, Value>) -> bool {
    let Ok(Value::Object(actual)) = serde_json::from_str::<Value>(call.arguments()) else {
        return false;
    };
    expected
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}

// ── JSON mode ──────────────────────────────────────────────────────

/// Opening fence of a markdown JSON code block.
const JSON_FENCE_OPEN: &str = "```json";
const FENCE: &str = "```";

/// Parse a JSON-mode answer and check it against `schema`.
///
/// The text is decoded as JSON, then as JSON5, then as the body of the first
/// fenced ```` ```json ```` block. A top-level array is checked item by item
/// and the first failing item is reported with its 1-based position. Returns
/// the decoded document on success.
///
/// ```
/// use hermes_template::validate::validate_json_data;
/// use serde_json::json;
///
/// let schema = json!({"type": "object", "required": ["name"]});
/// let text = "Here you go:\n```json\n{\"name\": \"Ada\"}\n```";
/// assert_eq!(validate_json_data(text, &schema).unwrap(), json!({"name": "Ada"}));
/// ```
pub fn validate_json_data(text: &str, schema: &Value) -> Result<Value, ValidationError> {
    let document = decode_json_lenient(text)?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;
    let violations = |instance: &Value| -> Vec<String> {
        validator
            .iter_errors(instance)
            .map(|e| format!("  - {}: {e}", e.instance_path()))
            .collect()
    };

    match &document {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let errors = violations(item);
                if !errors.is_empty() {
                    info!("JSON data item {} failed validation", i + 1);
                    return Err(ValidationError::ItemViolation {
                        item: i + 1,
                        errors,
                    });
                }
                trace!("JSON data item {} is valid", i + 1);
            }
        }
        single => {
            let errors = violations(single);
            if !errors.is_empty() {
                info!("JSON data failed validation");
                return Err(ValidationError::DataViolation { errors });
            }
        }
    }

    debug!("JSON data is valid against the schema");
    Ok(document)
}

fn decode_json_lenient(text: &str) -> Result<Value, ValidationError> {
    let text = text.trim();
    let json5_err = match serde_json::from_str(text) {
        Ok(v) => return Ok(v),
        Err(_) => match json5::from_str(text) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        },
    };

    let Some(fenced) = fenced_json(text) else {
        return Err(ValidationError::MalformedJson(json5_err.to_string()));
    };
    trace!("decoding fenced JSON block ({} bytes)", fenced.len());
    serde_json::from_str::<Value>(fenced)
        .or_else(|_| json5::from_str(fenced))
        .map_err(|e| ValidationError::MalformedJson(e.to_string()))
}

/// Body of the first ```` ```json ```` block, or of the first bare fence.
fn fenced_json(text: &str) -> Option<&str> {
    let (_, after_open) = text
        .split_once(JSON_FENCE_OPEN)
        .or_else(|| text.split_once(FENCE))?;
    let (body, _) = after_open.split_once(FENCE)?;
    Some(body.trim())
}
