//! Loading conversations and tool definitions from files or stdin.
//!
//! Files may be JSON5 (comments, trailing commas, single quotes) or strict
//! JSON. Field names follow the chat-completions wire format, so transcripts
//! exported from a chat API load directly:
//!
//! ```json5
//! {
//!   system: "You are a helpful assistant.",
//!   tools: [{ type: "function", function: { name: "get_weather", description: "…", parameters: {} } }],
//!   messages: [
//!     { role: "user", content: "Weather in Paris?" },
//!     { role: "assistant", tool_calls: [{ function: { name: "get_weather", arguments: "{\"location\": \"Paris\"}" } }] },
//!     { role: "tool", content: "{\"temperature\": 18}" },
//!   ],
//! }
//! ```

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::{Conversation, ToolDef};

/// Parse content as JSON5, falling back to strict JSON.
pub fn parse_json5_or_json<T: DeserializeOwned>(content: &str, origin: &str) -> Result<T, LoadError> {
    json5::from_str(content).or_else(|json5_err| {
        serde_json::from_str(content).map_err(|json_err| LoadError::Parse {
            origin: origin.to_string(),
            message: format!("{json5_err} (as strict JSON: {json_err})"),
        })
    })
}

/// Read a file, or stdin when `path` is `None`.
pub fn read_input(path: Option<&Path>) -> Result<String, LoadError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(LoadError::Stdin)?;
            Ok(buf)
        }
    }
}

fn origin_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "stdin".to_string(), |p| format!("'{}'", p.display()))
}

impl Conversation {
    /// Parse a conversation from JSON5 or JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, LoadError> {
        parse_json5_or_json(content, "conversation")
    }
}

/// Load a conversation from a file, or stdin when `path` is `None`.
pub fn load_conversation(path: Option<&Path>) -> Result<Conversation, LoadError> {
    let content = read_input(path)?;
    let conversation: Conversation = parse_json5_or_json(&content, &origin_label(path))?;
    debug!(
        "loaded conversation from {}: {} message(s), {} tool(s)",
        origin_label(path),
        conversation.messages.len(),
        conversation.tools.len()
    );
    Ok(conversation)
}

/// A tools file is a list of definitions, one definition, or a whole
/// conversation. Variant order matters: any object deserializes as a
/// `Conversation`, so it is tried last.
#[derive(Deserialize)]
#[serde(untagged)]
enum ToolsFile {
    List(Vec<ToolDef>),
    Single(ToolDef),
    Conversation(Conversation),
}

/// Load tool definitions from a file holding a list of tools, a single tool,
/// or a conversation (whose `tools` are used).
///
/// A conversation without tools is an error: it usually means the file is a
/// mistyped tool definition rather than a conversation.
pub fn load_tools(path: &Path) -> Result<Vec<ToolDef>, LoadError> {
    let content = read_input(Some(path))?;
    let origin = origin_label(Some(path));
    let tools = match parse_json5_or_json::<ToolsFile>(&content, &origin)? {
        ToolsFile::List(tools) => tools,
        ToolsFile::Single(tool) => vec![tool],
        ToolsFile::Conversation(conversation) if conversation.tools.is_empty() => {
            return Err(LoadError::Parse {
                origin,
                message: "no tool definitions found (expected a tool, a list of tools, \
                          or a conversation with `tools`)"
                    .to_string(),
            });
        }
        ToolsFile::Conversation(conversation) => conversation.tools,
    };
    debug!("loaded {} tool(s) from '{}'", tools.len(), path.display());
    Ok(tools)
}

/// Load a JSON Schema document for JSON mode.
pub fn load_json_schema(path: &Path) -> Result<Value, LoadError> {
    let content = read_input(Some(path))?;
    parse_json5_or_json(&content, &origin_label(Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;

    #[test]
    fn parses_json5_conversation() {
        let conv = Conversation::from_json_str(
            r#"{
                // comments and trailing commas are fine
                system: 'Be brief.',
                messages: [
                    { role: 'user', content: 'hi' },
                    { role: 'assistant', tool_calls: [{ function: { name: 'f', arguments: { a: 'x' } } }] },
                ],
            }"#,
        )
        .unwrap();
        assert_eq!(conv.system, "Be brief.");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[1].role, MessageRole::Assistant);
        assert_eq!(conv.messages[1].tool_calls[0].arguments(), r#"{"a":"x"}"#);
    }

    #[test]
    fn parse_error_names_origin() {
        let err = Conversation::from_json_str("{ messages: [").unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref origin, .. } if origin == "conversation"));
    }

    #[test]
    fn load_conversation_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conv.json");
        let sample = crate::sample::weather_conversation();
        std::fs::write(&path, serde_json::to_string_pretty(&sample).unwrap()).unwrap();

        let loaded = load_conversation(Some(&path)).unwrap();
        assert_eq!(loaded, sample);
        assert_eq!(loaded.render(), sample.render());
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_conversation(Some(Path::new("does/not/exist.json"))).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.json"));
    }

    #[test]
    fn load_tools_accepts_list_or_conversation() {
        let dir = tempfile::tempdir().unwrap();

        let list_path = dir.path().join("tools.json");
        std::fs::write(
            &list_path,
            r#"[{"type": "function", "function": {"name": "a", "description": "A", "parameters": {}}}]"#,
        )
        .unwrap();
        let tools = load_tools(&list_path).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "a");

        let conv_path = dir.path().join("conv.json5");
        std::fs::write(
            &conv_path,
            "{ tools: [{ function: { name: 'b' } }], messages: [{ role: 'user', content: 'x' }] }",
        )
        .unwrap();
        let tools = load_tools(&conv_path).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "b");
    }

    #[test]
    fn load_tools_accepts_single_definition() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tool.json");
        std::fs::write(
            &path,
            r#"{"type":"function","function":{"name":"get_weather","parameters":{}}}"#,
        )
        .unwrap();
        let tools = load_tools(&path).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "get_weather");
    }

    #[test]
    fn load_tools_rejects_object_without_tools() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("typo.json");
        std::fs::write(&path, r#"{"tool": [{"function": {"name": "a"}}]}"#).unwrap();
        let err = load_tools(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
        assert!(err.to_string().contains("no tool definitions found"));

        let empty_list = dir.path().join("empty.json");
        std::fs::write(&empty_list, "[]").unwrap();
        assert!(load_tools(&empty_list).unwrap().is_empty());
    }

    #[test]
    fn load_json_schema_accepts_json5() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json5");
        std::fs::write(&path, "{ type: 'object', required: ['name'], }").unwrap();
        let schema = load_json_schema(&path).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "name");
    }
}
