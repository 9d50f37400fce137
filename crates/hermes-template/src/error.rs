//! Error types for loading, completion parsing and call validation.
//!
//! Rendering has no error type: every constructible
//! [`Conversation`](crate::Conversation) renders.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a conversation or tools file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    /// Neither the JSON5 nor the strict JSON parser accepted the input.
    #[error("failed to parse {origin}: {message}")]
    Parse { origin: String, message: String },
}

/// A `<tool_call>` block that could not be turned into a tool call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("unterminated <tool_call> block at byte {offset}")]
    Unterminated { offset: usize },

    #[error("tool call is not valid JSON or JSON5: {message} (text: {text})")]
    Malformed { text: String, message: String },

    #[error("tool call does not match the function-call schema: {reason} (text: {text})")]
    NotAFunctionCall { text: String, reason: String },
}

/// A parsed tool call, or JSON-mode output, that does not fit its schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no matching function signature found for function: {0}")]
    UnknownFunction(String),

    #[error("invalid JSON arguments for '{name}': {message}")]
    InvalidArguments { name: String, message: String },

    #[error("argument validation failed for '{name}':\n{}", errors.join("\n"))]
    SchemaViolation { name: String, errors: Vec<String> },

    /// JSON-mode output that no decoder accepted.
    #[error("JSON decoding error: {0}")]
    MalformedJson(String),

    #[error("JSON schema is not usable: {0}")]
    InvalidSchema(String),

    #[error("validation failed:\n{}", errors.join("\n"))]
    DataViolation { errors: Vec<String> },

    /// `item` is 1-based.
    #[error("validation failed for item {item}:\n{}", errors.join("\n"))]
    ItemViolation { item: usize, errors: Vec<String> },
}
