//! Render conversations into ChatML prompts and read completions back.
//!
//! Logs go to stderr; set `RUST_LOG` or `--log-level` to see them.
//!
//! # Examples
//!
//! ```sh
//! # Render a conversation file (JSON or JSON5)
//! hermes-template render --input conversation.json5
//!
//! # Render from stdin and open an assistant turn for generation
//! cat conversation.json | hermes-template render --generation-prompt
//!
//! # Render the built-in weather sample
//! hermes-template render --sample
//!
//! # Dump the sample conversation as an input template
//! hermes-template sample > conversation.json
//!
//! # Pull tool calls out of a raw completion and validate them
//! hermes-template extract --input completion.txt --tools conversation.json
//!
//! # JSON mode: prompt for, then check, a JSON answer
//! hermes-template render --input query.json --json-schema character.schema.json
//! hermes-template extract --input completion.txt --schema character.schema.json
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use hermes_template::completion::{
    extract_assistant_message, extract_scratch_pad, extract_tool_calls,
};
use hermes_template::load::{load_conversation, load_json_schema, load_tools, read_input};
use hermes_template::prompt::markers::{TURN_END, json_mode_system_prompt};
use hermes_template::validate::{validate_function_calls, validate_json_data};
use hermes_template::{ToolCall, logging, render, render_for_generation, sample};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// Render conversations into ChatML prompts for Hermes-style
/// function-calling models, and parse their completions.
#[derive(Parser)]
#[command(name = "hermes-template", version)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "info", "hermes_template=debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a conversation into a prompt
    Render {
        /// Conversation file (JSON or JSON5). Reads stdin when omitted.
        #[arg(long, conflicts_with = "sample")]
        input: Option<PathBuf>,

        /// Render the built-in weather sample instead of an input
        #[arg(long)]
        sample: bool,

        /// Append an open assistant turn for the model to complete
        #[arg(long)]
        generation_prompt: bool,

        /// JSON mode: replace the system instruction with one asking for
        /// JSON that matches this schema file
        #[arg(long)]
        json_schema: Option<PathBuf>,

        /// Write the prompt to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the built-in sample conversation as JSON
    Sample,

    /// Extract the assistant reply and tool calls from a completion
    Extract {
        /// Completion text file. Reads stdin when omitted.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Tools to validate against: a tool definition, a list of them, or a conversation file
        #[arg(long)]
        tools: Option<PathBuf>,

        /// JSON mode: decode the reply as JSON and validate it against this schema file
        #[arg(long)]
        schema: Option<PathBuf>,

        /// End-of-sequence token stripped from the assistant reply
        #[arg(long, default_value = TURN_END)]
        eos_token: String,

        /// Treat the whole input as the assistant reply
        #[arg(long)]
        raw: bool,
    },
}

// ── Extract report ─────────────────────────────────────────────────

#[derive(Serialize)]
struct ExtractReport {
    assistant_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scratch_pad: Option<String>,
    tool_calls: Vec<ToolCall>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extraction_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<Vec<ValidationEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_data: Option<JsonDataEntry>,
}

impl ExtractReport {
    fn all_valid(&self) -> bool {
        self.validation.as_ref().is_none_or(|v| v.is_empty())
            && self.json_data.as_ref().is_none_or(|j| j.error.is_none())
    }
}

#[derive(Serialize)]
struct ValidationEntry {
    index: usize,
    name: String,
    error: String,
}

#[derive(Serialize)]
struct JsonDataEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

// ── Commands ───────────────────────────────────────────────────────

fn write_output(path: Option<&Path>, text: &str) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| format!("failed to write '{}': {e}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .and_then(|_| stdout.flush())
                .map_err(|e| format!("failed to write stdout: {e}"))
        }
    }
}

fn run_render(
    input: Option<&Path>,
    use_sample: bool,
    generation_prompt: bool,
    json_schema: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), String> {
    let mut conversation = if use_sample {
        sample::weather_conversation()
    } else {
        load_conversation(input).map_err(|e| e.to_string())?
    };

    if let Some(path) = json_schema {
        let schema = load_json_schema(path).map_err(|e| e.to_string())?;
        conversation.system = json_mode_system_prompt(&schema);
        debug!("JSON mode: system instruction replaced");
    }

    let prompt = if generation_prompt {
        render_for_generation(&conversation)
    } else {
        render(&conversation)
    };
    info!("rendered prompt: {} bytes", prompt.len());
    write_output(output, &prompt)
}

fn run_sample() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&sample::weather_conversation())
        .map_err(|e| format!("failed to serialize sample: {e}"))?;
    write_output(None, &format!("{json}\n"))
}

fn build_extract_report(
    input: Option<&Path>,
    tools: Option<&Path>,
    schema: Option<&Path>,
    eos_token: &str,
    raw: bool,
) -> Result<ExtractReport, String> {
    let completion = read_input(input).map_err(|e| e.to_string())?;

    let assistant_message = if raw {
        completion.trim().replace(eos_token, "")
    } else {
        extract_assistant_message(&completion, eos_token)
            .ok_or_else(|| "no assistant turn found in completion".to_string())?
    };
    debug!("assistant message: {} bytes", assistant_message.len());

    let extraction = extract_tool_calls(&assistant_message);

    let validation = match tools {
        Some(path) => {
            let tool_defs = load_tools(path).map_err(|e| e.to_string())?;
            let entries = validate_function_calls(&extraction.calls, &tool_defs)
                .into_iter()
                .map(|(index, error)| ValidationEntry {
                    index,
                    name: extraction.calls[index].name().to_string(),
                    error: error.to_string(),
                })
                .collect::<Vec<_>>();
            Some(entries)
        }
        None => None,
    };

    let json_data = match schema {
        Some(path) => {
            let schema = load_json_schema(path).map_err(|e| e.to_string())?;
            Some(match validate_json_data(&assistant_message, &schema) {
                Ok(value) => JsonDataEntry {
                    value: Some(value),
                    error: None,
                },
                Err(e) => JsonDataEntry {
                    value: None,
                    error: Some(e.to_string()),
                },
            })
        }
        None => None,
    };

    Ok(ExtractReport {
        scratch_pad: extract_scratch_pad(&assistant_message),
        extraction_errors: extraction.errors.iter().map(|e| e.to_string()).collect(),
        tool_calls: extraction.calls,
        validation,
        json_data,
        assistant_message,
    })
}

/// Returns `Ok(false)` when the report was printed but some call, or the
/// JSON-mode answer, failed validation.
fn run_extract(
    input: Option<&Path>,
    tools: Option<&Path>,
    schema: Option<&Path>,
    eos_token: &str,
    raw: bool,
) -> Result<bool, String> {
    let report = build_extract_report(input, tools, schema, eos_token, raw)?;
    let all_valid = report.all_valid();
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("failed to serialize report: {e}"))?;
    write_output(None, &format!("{json}\n"))?;

    Ok(all_valid)
}

fn run(cli: &Cli) -> Result<bool, String> {
    match &cli.command {
        Command::Render {
            input,
            sample,
            generation_prompt,
            json_schema,
            output,
        } => run_render(
            input.as_deref(),
            *sample,
            *generation_prompt,
            json_schema.as_deref(),
            output.as_deref(),
        )
        .map(|_| true),
        Command::Sample => run_sample().map(|_| true),
        Command::Extract {
            input,
            tools,
            schema,
            eos_token,
            raw,
        } => run_extract(
            input.as_deref(),
            tools.as_deref(),
            schema.as_deref(),
            eos_token,
            *raw,
        ),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
