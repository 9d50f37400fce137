//! ChatML prompt rendering for Hermes-style function-calling models.
//!
//! `hermes-template` turns a structured conversation (ordered messages, an
//! optional set of callable tools, and an optional system instruction) into
//! the single flat prompt string a ChatML-tuned model expects: `<|im_start|>` /
//! `<|im_end|>` turn delimiters, `<tool_call>` markup inside assistant turns,
//! and `<tool_response>` markup grouped into one `tool` turn per run of tool
//! results. When tools are present, the leading system turn carries a fixed
//! tool-use preamble with the function-call JSON schema and the scratch-pad
//! reasoning protocol.
//!
//! The marker vocabulary and all surrounding whitespace are a wire contract:
//! a model tuned against this exact layout tokenizes it byte for byte, so the
//! renderer never re-encodes caller text. Tool-call arguments are copied into
//! the prompt as given; parameter schemas are written as compact JSON.
//!
//! # Getting started
//!
//! ```
//! use hermes_template::{Conversation, Message, ToolCall, ToolDef};
//! use serde_json::json;
//!
//! let conversation = Conversation::new()
//!     .with_system("You are a helpful assistant.")
//!     .with_tool(ToolDef::new(
//!         "get_weather",
//!         "Get the current weather for a location",
//!         json!({"location": "string"}),
//!     ))
//!     .with_message(Message::user("Weather in Paris?"))
//!     .with_message(Message::assistant_tool_calls(vec![ToolCall::new(
//!         "get_weather",
//!         r#"{"location": "Paris"}"#,
//!     )]))
//!     .with_message(Message::tool_result("call-1", r#"{"temperature": 18}"#));
//!
//! let prompt = conversation.render();
//! assert!(prompt.starts_with("<|im_start|>system\nYou are a helpful assistant.\n"));
//! assert!(prompt.contains("<tool_call>\n{\"name\": \"get_weather\", \"arguments\": {\"location\": \"Paris\"}}\n</tool_call>"));
//! assert!(prompt.ends_with("<tool_response>\n{\"temperature\": 18}\n</tool_response><|im_end|>\n"));
//! ```
//!
//! # Where to find things
//!
//! - **Render a prompt:** [`render`](prompt::render) or
//!   [`Conversation::render`]. Use
//!   [`render_for_generation`](prompt::render_for_generation) to leave an
//!   open assistant turn for the model to complete.
//! - **Audit the wire format:** every literal lives in [`prompt::markers`].
//! - **Read a completion back:** [`completion`] pulls the assistant turn,
//!   `<tool_call>` blocks and the scratch pad out of raw model output.
//! - **Check generated calls:** [`validate`] checks parsed calls against the
//!   tool definitions with JSON Schema.
//! - **JSON mode:** [`json_mode_system_prompt`](prompt::markers::json_mode_system_prompt)
//!   asks for schema-shaped JSON;
//!   [`validate_json_data`](validate::validate_json_data) checks the answer.
//! - **Load conversations from disk:** [`load`] accepts JSON or JSON5 files.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`prompt`] | Wire markers and the prompt renderer |
//! | [`completion`] | Assistant-turn, tool-call and scratch-pad extraction |
//! | [`validate`] | Function-call validation against tool signatures |
//! | [`load`] | Conversation and tool-file loading |
//! | [`sample`] | Built-in sample conversation |
//! | [`logging`] | `tracing` subscriber setup for the CLI |
//! | [`error`] | Error types for loading, extraction and validation |

pub mod completion;
pub mod error;
pub mod load;
pub mod logging;
pub mod prelude;
pub mod prompt;
pub mod sample;
pub mod validate;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use error::{ExtractError, LoadError, ValidationError};
pub use prompt::{render, render_for_generation};

// Re-export schemars for downstream crates.
pub use schemars;

// ── Schema generation ──────────────────────────────────────────────

/// Generate a JSON Schema `serde_json::Value` from a type that implements
/// `schemars::JsonSchema`. Useful for building [`ToolDef`] parameter
/// schemas from strong Rust types.
///
/// # Example
///
/// ```
/// use hermes_template::json_schema_for;
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, JsonSchema)]
/// struct WeatherArgs {
///     location: String,
///     #[serde(default)]
///     date: Option<String>,
/// }
///
/// let schema = json_schema_for::<WeatherArgs>();
/// assert_eq!(schema["type"], "object");
/// assert!(schema["required"].as_array().unwrap().contains(&"location".into()));
/// ```
pub fn json_schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}

// ── Serde helpers ──────────────────────────────────────────────────

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn is_empty_object(v: &Value) -> bool {
    v.as_object().is_some_and(|m| m.is_empty())
}

fn parameters_object<'de, D: Deserializer<'de>>(de: D) -> Result<Value, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => empty_object(),
        Some(v) => v,
    })
}

/// Arguments are opaque text. A string is kept as-is; any other JSON value
/// is stored as its compact serialization.
fn arguments_text<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
///
/// The four ChatML roles are recognized; anything else (including the empty
/// string) is carried through [`MessageRole::Other`] and rendered as a literal
/// turn tag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
    Other(String),
}

impl MessageRole {
    /// The literal tag written after `<|im_start|>`.
    pub fn as_str(&self) -> &str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
            MessageRole::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageRole {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "system" => MessageRole::System,
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            "tool" => MessageRole::Tool,
            _ => MessageRole::Other(tag),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(tag: &str) -> Self {
        MessageRole::from(tag.to_string())
    }
}

impl From<MessageRole> for String {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message in the conversation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    /// Tool calls requested by the model. Only rendered on assistant turns.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tool_calls: Vec<ToolCall>,
    /// Correlation id of a tool result. Accepted for compatibility with chat
    /// API transcripts; the ChatML layout does not render it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// A message with an arbitrary role tag.
    pub fn with_role(role: impl Into<MessageRole>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
        }
    }

    /// Attach visible content to a message (e.g. the assistant's narration
    /// alongside its tool calls).
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

// ── Tool types ─────────────────────────────────────────────────────

/// The type of a tool definition or call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum ToolType {
    #[default]
    #[serde(rename = "function")]
    Function,
}

/// A named function reference.
///
/// The same record serves tool definitions (which fill `description` and
/// `parameters`) and tool calls (which fill `arguments`). Unused fields are
/// left empty and omitted when serialized.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub description: String,
    /// Parameter schema, expected to be a JSON object. Rendered as compact
    /// JSON without interpretation.
    ///
    /// This is parsed JSON, not the caller's text: the rendered form drops
    /// insignificant whitespace and lists keys in `serde_json` map order
    /// (sorted, unless the `preserve_order` feature is enabled).
    #[serde(
        default = "empty_object",
        deserialize_with = "parameters_object",
        skip_serializing_if = "is_empty_object"
    )]
    pub parameters: Value,
    /// Pre-serialized call arguments, copied into prompts byte for byte.
    #[serde(
        default,
        deserialize_with = "arguments_text",
        skip_serializing_if = "String::is_empty"
    )]
    pub arguments: String,
}

/// Tool definition (OpenAI function-calling format).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolDef {
    #[serde(rename = "type", default)]
    pub tool_type: ToolType,
    pub function: FunctionDef,
}

impl ToolDef {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: description.into(),
                parameters,
                arguments: String::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// A tool call issued by the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ToolCall {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default)]
    pub call_type: ToolType,
    pub function: FunctionDef,
}

impl ToolCall {
    /// Create a call to `name` with pre-serialized `arguments`.
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            call_type: ToolType::Function,
            function: FunctionDef {
                name: name.into(),
                description: String::new(),
                parameters: empty_object(),
                arguments: arguments.into(),
            },
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    pub fn arguments(&self) -> &str {
        &self.function.arguments
    }
}

// ── Conversation ───────────────────────────────────────────────────

/// Input to the renderer.
///
/// When `messages` is non-empty the conversation renders in multi-turn mode
/// and `prompt`/`response` are ignored. Otherwise the single-turn fields are
/// used and `tools` is ignored.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Conversation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<ToolDef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub system: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prompt: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn with_tool(mut self, tool: ToolDef) -> Self {
        self.tools.push(tool);
        self
    }

    /// Single-turn fallback: the user prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Single-turn fallback: the assistant response.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = response.into();
        self
    }

    /// Render this conversation into a ChatML prompt.
    pub fn render(&self) -> String {
        prompt::render(self)
    }
}
