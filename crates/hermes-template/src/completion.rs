//! Reading model output back into structured data.
//!
//! A completion produced from a rendered prompt follows the same wire
//! vocabulary: the assistant turn opens with `<|im_start|>assistant`, calls
//! are wrapped in `<tool_call>` blocks holding `{"name": ..., "arguments":
//! {...}}`, and reasoning goes in a `<scratch_pad>` block.
//!
//! Extraction is tolerant. Each `<tool_call>` block is parsed on its own, so a
//! malformed block is reported in [`ToolCallExtraction::errors`] without
//! discarding the well-formed ones around it.

use std::sync::OnceLock;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::ExtractError;
use crate::prompt::markers::{
    SCRATCH_PAD_CLOSE, SCRATCH_PAD_OPEN, TOOL_CALL_CLOSE, TOOL_CALL_OPEN, TURN_START,
};
use crate::{ToolCall, json_schema_for};

/// Role tag that starts the assistant's reply.
const ASSISTANT_TAG: &str = "assistant";

/// The JSON object a model emits inside a `<tool_call>` block.
#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct FunctionCallRecord {
    pub name: String,
    pub arguments: serde_json::Map<String, Value>,
}

impl From<FunctionCallRecord> for ToolCall {
    fn from(record: FunctionCallRecord) -> Self {
        ToolCall::new(record.name, Value::Object(record.arguments).to_string())
    }
}

/// Result of scanning text for `<tool_call>` blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallExtraction {
    /// Successfully parsed calls, in order of appearance.
    pub calls: Vec<ToolCall>,
    /// Blocks that could not be parsed, in order of appearance.
    pub errors: Vec<ExtractError>,
}

impl ToolCallExtraction {
    /// True when at least one tool call was parsed.
    pub fn is_valid(&self) -> bool {
        !self.calls.is_empty()
    }
}

/// Return the reply following the last `<|im_start|>assistant` marker.
///
/// Whitespace between the marker and the role tag is allowed. The reply is
/// trimmed and every occurrence of `eos_token` is removed. Returns `None` if
/// the completion has no assistant turn.
///
/// ```
/// use hermes_template::completion::extract_assistant_message;
///
/// let completion = "<|im_start|>user\nHi<|im_end|>\n<|im_start|>assistant\nHello!<|im_end|>";
/// assert_eq!(
///     extract_assistant_message(completion, "<|im_end|>").as_deref(),
///     Some("Hello!")
/// );
/// ```
pub fn extract_assistant_message(completion: &str, eos_token: &str) -> Option<String> {
    let completion = completion.trim();

    let reply = completion
        .match_indices(TURN_START)
        .filter_map(|(idx, _)| {
            let after = completion.get(idx + TURN_START.len()..)?;
            after.trim_start().strip_prefix(ASSISTANT_TAG)
        })
        .last();

    let Some(reply) = reply else {
        debug!("no assistant turn found in completion ({} bytes)", completion.len());
        return None;
    };

    let reply = reply.trim();
    if eos_token.is_empty() {
        Some(reply.to_string())
    } else {
        Some(reply.replace(eos_token, ""))
    }
}

/// Parse every `<tool_call>` block in `text`.
///
/// Block bodies are parsed as JSON, falling back to JSON5 so the
/// single-quoted form shown in the tool-use preamble is accepted too. Parsed
/// calls carry their arguments as compact JSON text.
pub fn extract_tool_calls(text: &str) -> ToolCallExtraction {
    let mut extraction = ToolCallExtraction::default();
    let mut rest = text;
    let mut offset = 0;

    while let Some((before, after_open)) = rest.split_once(TOOL_CALL_OPEN) {
        let block_start = offset + before.len();
        let Some((body, after_close)) = after_open.split_once(TOOL_CALL_CLOSE) else {
            warn!("unterminated <tool_call> block at byte {block_start}");
            extraction
                .errors
                .push(ExtractError::Unterminated { offset: block_start });
            break;
        };

        match parse_tool_call(body.trim()) {
            Ok(call) => {
                trace!("parsed tool call: {}({})", call.name(), call.arguments());
                extraction.calls.push(call);
            }
            Err(e) => {
                warn!("skipping tool call block: {e}");
                extraction.errors.push(e);
            }
        }

        offset = text.len() - after_close.len();
        rest = after_close;
    }

    debug!(
        "extracted {} tool call(s), {} failure(s)",
        extraction.calls.len(),
        extraction.errors.len()
    );
    extraction
}

/// Return the trimmed body of the first `<scratch_pad>` block.
pub fn extract_scratch_pad(text: &str) -> Option<String> {
    let (_, after_open) = text.split_once(SCRATCH_PAD_OPEN)?;
    let (body, _) = after_open.split_once(SCRATCH_PAD_CLOSE)?;
    Some(body.trim().to_string())
}

// ── Helpers ────────────────────────────────────────────────────────

fn function_call_validator() -> Option<&'static jsonschema::Validator> {
    static VALIDATOR: OnceLock<Option<jsonschema::Validator>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| jsonschema::validator_for(&json_schema_for::<FunctionCallRecord>()).ok())
        .as_ref()
}

fn parse_tool_call(body: &str) -> Result<ToolCall, ExtractError> {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(json_err) => json5::from_str(body).map_err(|json5_err| ExtractError::Malformed {
            text: body.to_string(),
            message: format!("{json_err}; JSON5 fallback: {json5_err}"),
        })?,
    };

    if let Some(validator) = function_call_validator() {
        let errors: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| format!("{}: {e}", e.instance_path()))
            .collect();
        if !errors.is_empty() {
            return Err(ExtractError::NotAFunctionCall {
                text: body.to_string(),
                reason: errors.join("; "),
            });
        }
    }

    let record: FunctionCallRecord =
        serde_json::from_value(value).map_err(|e| ExtractError::NotAFunctionCall {
            text: body.to_string(),
            reason: e.to_string(),
        })?;
    Ok(record.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::markers::TURN_END;

    #[test]
    fn assistant_message_takes_last_assistant_turn() {
        let completion = "<|im_start|>system\nS<|im_end|>\n\
                          <|im_start|>assistant\nfirst<|im_end|>\n\
                          <|im_start|>user\nagain<|im_end|>\n\
                          <|im_start|> assistant\n  second answer <|im_end|>\n";
        assert_eq!(
            extract_assistant_message(completion, TURN_END).as_deref(),
            Some("second answer ")
        );
    }

    #[test]
    fn assistant_message_missing() {
        assert_eq!(
            extract_assistant_message("<|im_start|>user\nhi<|im_end|>", TURN_END),
            None
        );
        assert_eq!(extract_assistant_message("", TURN_END), None);
    }

    #[test]
    fn assistant_message_keeps_eos_with_empty_token() {
        assert_eq!(
            extract_assistant_message("<|im_start|>assistant\nok<|im_end|>", "").as_deref(),
            Some("ok<|im_end|>")
        );
    }

    #[test]
    fn extracts_json_tool_calls_in_order() {
        let text = "<scratch_pad>\nGoal: weather\n</scratch_pad>\n\
                    <tool_call>\n{\"name\": \"get_weather\", \"arguments\": {\"location\": \"NYC\"}}\n</tool_call>\n\
                    <tool_call>\n{\"name\": \"get_time\", \"arguments\": {}}\n</tool_call>";
        let extraction = extract_tool_calls(text);
        assert!(extraction.is_valid());
        assert!(extraction.errors.is_empty());
        assert_eq!(extraction.calls.len(), 2);
        assert_eq!(extraction.calls[0].name(), "get_weather");
        assert_eq!(extraction.calls[0].arguments(), r#"{"location":"NYC"}"#);
        assert_eq!(extraction.calls[1].name(), "get_time");
        assert_eq!(extraction.calls[1].arguments(), "{}");
    }

    #[test]
    fn single_quoted_calls_fall_back_to_json5() {
        let text = "<tool_call>\n{'name': 'get_stock_price', 'arguments': {'symbol': 'TSLA'}}\n</tool_call>";
        let extraction = extract_tool_calls(text);
        assert_eq!(extraction.calls.len(), 1);
        assert_eq!(extraction.calls[0].name(), "get_stock_price");
        assert_eq!(extraction.calls[0].arguments(), r#"{"symbol":"TSLA"}"#);
    }

    #[test]
    fn malformed_block_does_not_hide_others() {
        let text = "<tool_call>{oops</tool_call><tool_call>{\"name\": \"ok\", \"arguments\": {}}</tool_call>";
        let extraction = extract_tool_calls(text);
        assert_eq!(extraction.calls.len(), 1);
        assert_eq!(extraction.calls[0].name(), "ok");
        assert_eq!(extraction.errors.len(), 1);
        assert!(matches!(
            extraction.errors[0],
            ExtractError::Malformed { ref text, .. } if text == "{oops"
        ));
    }

    #[test]
    fn rejects_records_without_function_shape() {
        let text = "<tool_call>{\"name\": \"f\"}</tool_call>\
                    <tool_call>{\"name\": 3, \"arguments\": {}}</tool_call>\
                    <tool_call>[1, 2]</tool_call>";
        let extraction = extract_tool_calls(text);
        assert!(!extraction.is_valid());
        assert_eq!(extraction.errors.len(), 3);
        assert!(
            extraction
                .errors
                .iter()
                .all(|e| matches!(e, ExtractError::NotAFunctionCall { .. }))
        );
    }

    #[test]
    fn unterminated_block_reports_offset() {
        let text = "ok <tool_call>{\"name\": \"a\", \"arguments\": {}}</tool_call> then <tool_call>{";
        let extraction = extract_tool_calls(text);
        assert_eq!(extraction.calls.len(), 1);
        let expected_offset = text.rfind(TOOL_CALL_OPEN).unwrap();
        assert_eq!(
            extraction.errors,
            vec![ExtractError::Unterminated {
                offset: expected_offset
            }]
        );
    }

    #[test]
    fn no_blocks_is_empty_extraction() {
        let extraction = extract_tool_calls("The weather is sunny.");
        assert_eq!(extraction, ToolCallExtraction::default());
        assert!(!extraction.is_valid());
    }

    #[test]
    fn scratch_pad_body() {
        let text = "<scratch_pad>\nGoal: check\nActions: None\n</scratch_pad>\nanswer";
        assert_eq!(
            extract_scratch_pad(text).as_deref(),
            Some("Goal: check\nActions: None")
        );
        assert_eq!(extract_scratch_pad("<scratch_pad>never closed"), None);
        assert_eq!(extract_scratch_pad("nothing here"), None);
    }

    #[test]
    fn rendered_tool_calls_extract_back() {
        let prompt = crate::sample::weather_conversation().render();
        let reply = prompt.split("<|im_start|>tool").next().unwrap();
        let message = extract_assistant_message(reply, TURN_END).unwrap();
        let extraction = extract_tool_calls(&message);
        assert_eq!(extraction.calls.len(), 2);
        let args: Value = serde_json::from_str(extraction.calls[1].arguments()).unwrap();
        assert_eq!(
            args,
            serde_json::json!({"location": "Los Angeles", "date": "today"})
        );
    }
}
