//! Literal wire-format vocabulary.
//!
//! Every byte here is part of the prompt contract with the model: changing a
//! marker, the preamble, or even a newline inside these constants breaks
//! compatibility with models tuned against this layout. The golden test
//! below pins them.

/// Opens a turn; followed directly by the role tag.
pub const TURN_START: &str = "<|im_start|>";
/// Closes a turn. Also the end-of-sequence token of ChatML models.
pub const TURN_END: &str = "<|im_end|>";

pub const TOOLS_OPEN: &str = "<tools>";
pub const TOOLS_CLOSE: &str = "</tools>";

pub const TOOL_CALL_OPEN: &str = "<tool_call>";
pub const TOOL_CALL_CLOSE: &str = "</tool_call>";

pub const TOOL_RESPONSE_OPEN: &str = "<tool_response>";
pub const TOOL_RESPONSE_CLOSE: &str = "</tool_response>";

pub const SCRATCH_PAD_OPEN: &str = "<scratch_pad>";
pub const SCRATCH_PAD_CLOSE: &str = "</scratch_pad>";

/// Introduces the tool-calling protocol. Emitted right before the tools list.
pub const TOOL_USE_PREAMBLE: &str = "You are a function calling AI model. You are provided with function signatures within <tools> </tools> XML tags. You may call one or more functions to assist with the user query. If available tools are not relevant in assisting with user query, just respond in natural conversational language. Don't make assumptions about what values to plug into functions. After calling & executing the functions, you will be provided with function results within <tool_response> </tool_response> XML tags.";

/// Function-call JSON schema and the scratch-pad reasoning protocol.
/// Emitted right after the tools list, with no trailing newline.
pub const FUNCTION_CALL_INSTRUCTIONS: &str = "\
For each function call return a JSON object, with the following pydantic model json schema for each:
{'title': 'FunctionCall', 'type': 'object', 'properties': {'arguments': {'title': 'Arguments', 'type': 'object'}, 'name': {'title': 'Name', 'type': 'string'}}, 'required': ['arguments', 'name']}
Each function call should be enclosed within <tool_call> </tool_call> XML tags. You must use <scratch_pad> </scratch_pad> XML tags to record your reasoning and planning before you call the functions as follows.
Example:
<scratch_pad>
Goal: <state task assigned by user>
Actions:
<if tool calls need to be generated:>
- {result_var_name1} = functions.{function_name1}({param1}={value1},...)
- {result_var_name2, result_var_name3} = ...
<if no tool call needs to be generated:> None
Observation: <set observation 'None' with tool calls; plan final tools results summary when provided>
Reflection: <evaluate query-tool relevance and required parameters when tools called; analyze overall task status when observations made>
</scratch_pad>
<tool_call>
{'name': <function-name>, 'arguments': <args-dict>}
</tool_call>";

/// System instruction for JSON mode; followed by the schema block.
pub const JSON_MODE_PREAMBLE: &str =
    "You are a helpful assistant that answers in JSON. Here's the json schema you must adhere to:";

/// Wraps the schema on both sides. The closing tag has no slash.
pub const SCHEMA_TAG: &str = "<schema>";

/// The JSON-mode system instruction for `schema`, rendered as compact JSON.
///
/// Use it as a conversation's `system` text, then check the reply with
/// [`validate_json_data`](crate::validate::validate_json_data).
pub fn json_mode_system_prompt(schema: &serde_json::Value) -> String {
    format!("{JSON_MODE_PREAMBLE}\n{SCHEMA_TAG}\n{schema}\n{SCHEMA_TAG}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preamble_mentions_every_tag_pair() {
        for tag in [TOOLS_OPEN, TOOLS_CLOSE, TOOL_RESPONSE_OPEN, TOOL_RESPONSE_CLOSE] {
            assert!(TOOL_USE_PREAMBLE.contains(tag), "missing {tag}");
        }
        for tag in [
            TOOL_CALL_OPEN,
            TOOL_CALL_CLOSE,
            SCRATCH_PAD_OPEN,
            SCRATCH_PAD_CLOSE,
        ] {
            assert!(FUNCTION_CALL_INSTRUCTIONS.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn instruction_block_layout() {
        assert!(!TOOL_USE_PREAMBLE.contains('\n'));
        assert!(FUNCTION_CALL_INSTRUCTIONS.starts_with("For each function call return a JSON object"));
        assert!(FUNCTION_CALL_INSTRUCTIONS.ends_with("\n</tool_call>"));
        assert_eq!(FUNCTION_CALL_INSTRUCTIONS.lines().count(), 17);
        assert!(!FUNCTION_CALL_INSTRUCTIONS.lines().any(|l| l.ends_with(' ')));
    }

    #[test]
    fn json_mode_prompt_wraps_schema() {
        let prompt = json_mode_system_prompt(&json!({"type": "object"}));
        assert_eq!(
            prompt,
            "You are a helpful assistant that answers in JSON. Here's the json schema you must adhere to:\n\
             <schema>\n{\"type\":\"object\"}\n<schema>"
        );
    }
}
