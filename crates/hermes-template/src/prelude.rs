//! Convenience re-exports for common `hermes-template` types.
//!
//! ```ignore
//! use hermes_template::prelude::*;
//! ```
//!
//! Pulls in the conversation model, the renderer, and the completion and
//! validation entry points. Wire constants stay in
//! [`prompt::markers`](crate::prompt::markers).

// ── Conversation model ──────────────────────────────────────────────
pub use crate::{
    Conversation, FunctionDef, Message, MessageRole, ToolCall, ToolDef, ToolType, json_schema_for,
};

// ── Rendering ───────────────────────────────────────────────────────
pub use crate::prompt::markers::json_mode_system_prompt;
pub use crate::prompt::{RenderMode, render, render_for_generation};

// ── Completions ─────────────────────────────────────────────────────
pub use crate::completion::{
    FunctionCallRecord, ToolCallExtraction, extract_assistant_message, extract_scratch_pad,
    extract_tool_calls,
};
pub use crate::validate::{
    arguments_match, validate_function_call, validate_function_calls, validate_json_data,
};

// ── Loading and errors ──────────────────────────────────────────────
pub use crate::error::{ExtractError, LoadError, ValidationError};
pub use crate::load::{load_conversation, load_tools};
