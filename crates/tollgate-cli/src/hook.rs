//! Where the tool call comes from.
//!
//! The tool name and input are taken from `--tool`/`--input`, then from
//! `CLAUDE_TOOL_NAME`/`CLAUDE_TOOL_INPUT`. When no tool name is given either
//! way, stdin is read as a hook event: `{"tool_name": ..., "tool_input": {...}}`.

use std::io::Read;

use serde_json::{Map, Value};

/// Environment variable carrying the tool name
pub const TOOL_NAME_VAR: &str = "CLAUDE_TOOL_NAME";
/// Environment variable carrying the tool input as JSON
pub const TOOL_INPUT_VAR: &str = "CLAUDE_TOOL_INPUT";

/// A raw tool call, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct HookRequest {
    /// Tool name as invoked; empty if unknown
    pub tool_name: String,
    /// Tool input payload; an empty object if missing or malformed
    pub input: Value,
}

impl HookRequest {
    /// Resolve the request from explicit values, falling back to `stdin`.
    pub fn resolve(tool: Option<String>, input: Option<String>, stdin: impl Read) -> Self {
        match tool {
            Some(tool_name) => Self {
                tool_name,
                input: input.map(|raw| parse_input(&raw)).unwrap_or_else(empty),
            },
            None => Self::from_event(stdin),
        }
    }

    fn from_event(mut stdin: impl Read) -> Self {
        let mut raw = String::new();
        if let Err(e) = stdin.read_to_string(&mut raw) {
            tracing::warn!(error = %e, "failed to read hook event from stdin");
        }

        let event = match serde_json::from_str::<Value>(&raw) {
            Ok(event) => event,
            Err(e) => {
                if !raw.trim().is_empty() {
                    tracing::warn!(error = %e, "ignoring malformed hook event");
                }
                Value::Null
            }
        };

        Self {
            tool_name: event
                .get("tool_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            input: event.get("tool_input").cloned().unwrap_or_else(empty),
        }
    }
}

fn empty() -> Value {
    Value::Object(Map::new())
}

fn parse_input(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return empty();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring malformed tool input");
        empty()
    })
}
