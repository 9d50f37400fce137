//! Conversation → ChatML prompt.
//!
//! Rendering runs in phases:
//!
//! 1. **Mode selection.** A conversation with messages renders in multi-turn
//!    mode; one without falls back to the single-turn `system`/`prompt`/
//!    `response` fields.
//! 2. **System block** (multi-turn only). Emitted when there is a system
//!    instruction or at least one tool. Tools add the fixed preamble, the
//!    tools list and the function-call instructions.
//! 3. **Turn iteration.** Messages are written in order. Consecutive `tool`
//!    messages share one enclosing `tool` turn, closed when a non-tool message
//!    arrives or the conversation ends.
//! 4. **Tool-call serialization.** An assistant message with tool calls
//!    renders one `<tool_call>` block per call instead of its content.
//!
//! Caller text (content, arguments) is copied verbatim. Parameter schemas are
//! written as compact JSON.

use tracing::{debug, trace};

use super::markers::{
    FUNCTION_CALL_INSTRUCTIONS, TOOL_CALL_CLOSE, TOOL_CALL_OPEN, TOOL_RESPONSE_CLOSE,
    TOOL_RESPONSE_OPEN, TOOL_USE_PREAMBLE, TOOLS_CLOSE, TOOLS_OPEN, TURN_END, TURN_START,
};
use crate::{Conversation, Message, MessageRole, ToolCall, ToolDef};

/// Which layout a conversation renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Messages are present: system block plus one turn per message.
    MultiTurn,
    /// No messages: system, prompt and response fields only.
    SingleTurn,
}

impl RenderMode {
    pub fn select(conversation: &Conversation) -> Self {
        if conversation.messages.is_empty() {
            RenderMode::SingleTurn
        } else {
            RenderMode::MultiTurn
        }
    }
}

/// Render a conversation into a ChatML prompt.
///
/// Deterministic and total: identical input always yields identical bytes,
/// and no input is rejected.
///
/// # Example
///
/// ```
/// use hermes_template::{Conversation, render};
///
/// let prompt = render(&Conversation::new().with_prompt("Hi"));
/// assert_eq!(
///     prompt,
///     "\n<|im_start|>user\nHi<|im_end|>\n\n<|im_start|>assistant\n<|im_end|>\n"
/// );
/// ```
pub fn render(conversation: &Conversation) -> String {
    let mode = RenderMode::select(conversation);
    debug!(
        "rendering prompt: mode={:?}, messages={}, tools={}",
        mode,
        conversation.messages.len(),
        conversation.tools.len(),
    );

    let mut out = String::new();
    match mode {
        RenderMode::MultiTurn => {
            write_system_block(&mut out, &conversation.system, &conversation.tools);
            write_turns(&mut out, &conversation.messages);
        }
        RenderMode::SingleTurn => write_single_turn(&mut out, conversation),
    }
    out.push('\n');

    trace!("rendered prompt ({} bytes)", out.len());
    out
}

/// Render a conversation and leave an open assistant turn for the model to
/// continue from.
pub fn render_for_generation(conversation: &Conversation) -> String {
    let mut out = render(conversation);
    open_turn(&mut out, MessageRole::Assistant.as_str());
    out.push('\n');
    out
}

// ── Phases ─────────────────────────────────────────────────────────

fn open_turn(out: &mut String, role: &str) {
    out.push_str(TURN_START);
    out.push_str(role);
}

fn write_system_block(out: &mut String, system: &str, tools: &[ToolDef]) {
    if system.is_empty() && tools.is_empty() {
        return;
    }

    open_turn(out, MessageRole::System.as_str());
    out.push('\n');
    out.push_str(system);
    if !tools.is_empty() {
        write_tool_instructions(out, tools);
    }
    out.push_str(TURN_END);
}

fn write_tool_instructions(out: &mut String, tools: &[ToolDef]) {
    out.push('\n');
    out.push_str(TOOL_USE_PREAMBLE);
    out.push('\n');
    out.push_str(TOOLS_OPEN);
    for tool in tools {
        let function = &tool.function;
        out.push('\n');
        out.push_str(&function.name);
        out.push_str(": ");
        out.push_str(&function.description);
        out.push_str("\nParameters: ");
        out.push_str(&function.parameters.to_string());
    }
    out.push('\n');
    out.push_str(TOOLS_CLOSE);
    out.push('\n');
    out.push_str(FUNCTION_CALL_INSTRUCTIONS);
}

fn write_turns(out: &mut String, messages: &[Message]) {
    let mut in_tool_group = false;

    for message in messages {
        if message.role == MessageRole::Tool {
            if !in_tool_group {
                out.push('\n');
                open_turn(out, MessageRole::Tool.as_str());
                in_tool_group = true;
            }
            write_tool_response(out, &message.content);
            continue;
        }

        if in_tool_group {
            out.push_str(TURN_END);
            in_tool_group = false;
        }

        out.push('\n');
        open_turn(out, message.role.as_str());
        if message.role == MessageRole::Assistant && !message.tool_calls.is_empty() {
            for call in &message.tool_calls {
                write_tool_call(out, call);
            }
        } else {
            out.push('\n');
            out.push_str(&message.content);
        }
        out.push_str(TURN_END);
    }

    if in_tool_group {
        out.push_str(TURN_END);
    }
}

fn write_tool_response(out: &mut String, content: &str) {
    out.push('\n');
    out.push_str(TOOL_RESPONSE_OPEN);
    out.push('\n');
    out.push_str(content);
    out.push('\n');
    out.push_str(TOOL_RESPONSE_CLOSE);
}

/// `{"name": "<name>", "arguments": <arguments>}` with both fields inserted
/// as-is. Arguments are never re-encoded.
fn write_tool_call(out: &mut String, call: &ToolCall) {
    out.push('\n');
    out.push_str(TOOL_CALL_OPEN);
    out.push_str("\n{\"name\": \"");
    out.push_str(call.name());
    out.push_str("\", \"arguments\": ");
    out.push_str(call.arguments());
    out.push_str("}\n");
    out.push_str(TOOL_CALL_CLOSE);
}

fn write_single_turn(out: &mut String, conversation: &Conversation) {
    if !conversation.system.is_empty() {
        out.push('\n');
        open_turn(out, MessageRole::System.as_str());
        out.push('\n');
        out.push_str(&conversation.system);
        out.push_str(TURN_END);
    }

    if !conversation.prompt.is_empty() {
        out.push('\n');
        open_turn(out, MessageRole::User.as_str());
        out.push('\n');
        out.push_str(&conversation.prompt);
        out.push_str(TURN_END);
    }

    // The assistant turn is always present, even with an empty response.
    out.push_str("\n\n");
    open_turn(out, MessageRole::Assistant.as_str());
    out.push('\n');
    out.push_str(&conversation.response);
    out.push_str(TURN_END);
}
