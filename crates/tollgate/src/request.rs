//! Normalized tool actions.
//!
//! The raw tool name and JSON payload are decoded once into a [`ToolAction`]
//! so guards never look at the payload themselves.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::paths::absolutize;

/// Payload fields that may carry the target path, in lookup order.
const PATH_FIELDS: [&str; 3] = ["file_path", "path", "notebook_path"];

/// The kind of file operation a tool call performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    /// Reading file contents
    Read,
    /// Editing an existing file in place
    Edit,
    /// Writing a whole file
    Write,
    /// Any other tool; never blocked
    Other,
}

impl ActionKind {
    /// Classify a tool name.
    pub fn from_tool_name(name: &str) -> Self {
        match name {
            "Read" => ActionKind::Read,
            "Edit" | "MultiEdit" | "NotebookEdit" => ActionKind::Edit,
            "Write" => ActionKind::Write,
            _ => ActionKind::Other,
        }
    }

    /// Returns true if this action modifies a file.
    pub fn is_write(&self) -> bool {
        matches!(self, ActionKind::Edit | ActionKind::Write)
    }
}

/// A tool call, reduced to what the guards need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolAction {
    /// The tool name as invoked
    pub tool_name: String,
    /// Kind of file operation
    pub kind: ActionKind,
    /// Absolute, normalized target path, if the payload named one
    pub target: Option<PathBuf>,
}

impl ToolAction {
    /// Create an action directly.
    pub fn new(tool_name: impl Into<String>, kind: ActionKind, target: Option<PathBuf>) -> Self {
        Self {
            tool_name: tool_name.into(),
            kind,
            target,
        }
    }

    /// Decode a tool call.
    ///
    /// A missing, empty or non-string path field yields `target = None`,
    /// which disables path-based guards for this call.
    pub fn parse(tool_name: &str, input: &Value, working_dir: &Path) -> Self {
        let target = PATH_FIELDS
            .iter()
            .find_map(|field| input.get(*field).and_then(Value::as_str))
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(|raw| absolutize(Path::new(raw), working_dir));

        Self {
            tool_name: tool_name.to_string(),
            kind: ActionKind::from_tool_name(tool_name),
            target,
        }
    }

    /// The target path, if this action is a read of a known file.
    pub fn read_target(&self) -> Option<&Path> {
        match self.kind {
            ActionKind::Read => self.target.as_deref(),
            _ => None,
        }
    }
}
