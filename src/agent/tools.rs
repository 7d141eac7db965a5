//! Tool definitions for the chat agent.
//!
//! This module defines the tools that the LLM can use to read, list and
//! edit files inside the workspace, and the executor that dispatches
//! tool calls to them.

use crate::models::{ToolCall, ToolDefinition};
use crate::workspace::{Workspace, WorkspaceError};
use serde_json::{json, Value};
use std::fs;
use std::io;
use thiserror::Error;
use tracing::debug;

/// Failure of a single tool invocation.
///
/// The `Display` text is what the model sees inside the `{"error": ...}`
/// payload.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("Path is required.")]
    MissingPath,

    #[error("Invalid input: 'path' and 'new_str' are required.")]
    MissingEditInput,

    #[error("Invalid input: 'old_str' and 'new_str' must be different if 'old_str' is provided.")]
    IdenticalEdit,

    #[error("File not found or is not a regular file: {path}")]
    NotARegularFile { path: String },

    #[error("File not found: {path}, and 'old_str' was provided, so not creating a new file.")]
    EditTargetMissing { path: String },

    #[error("Path exists but is not a file: {path}")]
    NotAFile { path: String },

    #[error("'old_str' not found in file {path}.")]
    OldStrNotFound { path: String },

    #[error("Error reading file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Error editing file {path}: {source}")]
    Edit {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Tool '{name}' not found by agent.")]
    UnknownTool { name: String },
}

/// Result of executing a tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    /// Text placed in the tool turn: raw output on success, a JSON error object otherwise.
    pub fn content(&self) -> String {
        match &self.error {
            Some(message) => json!({ "error": message }).to_string(),
            None => self.output.clone(),
        }
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(result: Result<String, ToolError>) -> Self {
        match result {
            Ok(output) => ToolResult::success(output),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}

/// Signature every tool implementation is bound through.
pub type ToolHandler = fn(&Workspace, &Value) -> Result<String, ToolError>;

/// A registered tool: its schema plus the function that runs it.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    handler: ToolHandler,
}

impl Tool {
    pub fn new(definition: ToolDefinition, handler: ToolHandler) -> Self {
        Self {
            definition,
            handler,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }
}

/// The tools executor that handles tool calls.
///
/// The tool set is fixed when the executor is built.
pub struct ToolExecutor {
    workspace: Workspace,
    tools: Vec<Tool>,
}

impl ToolExecutor {
    /// Create an executor with the given tools.
    pub fn new(workspace: Workspace, tools: Vec<Tool>) -> Self {
        Self { workspace, tools }
    }

    /// Create an executor with `read_file`, `list_files` and `edit_file`.
    pub fn with_builtin_tools(workspace: Workspace) -> Self {
        Self::new(workspace, builtin_tools())
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Schemas for the Ollama request, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Execute a tool call and return the result.
    pub fn execute(&self, tool_call: &ToolCall) -> ToolResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {}", name, args);

        match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => (tool.handler)(&self.workspace, args).into(),
            None => ToolResult::error(ToolError::UnknownTool { name: name.clone() }.to_string()),
        }
    }
}

/// String argument lookup; non-string values count as absent.
fn str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Read the contents of a file.
pub fn read_file(workspace: &Workspace, args: &Value) -> Result<String, ToolError> {
    let path = match str_arg(args, "path") {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ToolError::MissingPath),
    };

    let full_path = workspace.resolve(path)?;

    if !full_path.is_file() {
        return Err(ToolError::NotARegularFile {
            path: path.to_string(),
        });
    }

    fs::read_to_string(&full_path).map_err(|source| ToolError::Read {
        path: path.to_string(),
        source,
    })
}

/// List files in a directory as a JSON array.
pub fn list_files(workspace: &Workspace, args: &Value) -> Result<String, ToolError> {
    let dir = str_arg(args, "path").unwrap_or(".");
    let entries = workspace.list_directory(dir)?;
    Ok(json!(entries).to_string())
}

/// Replace, append or create text in a file.
pub fn edit_file(workspace: &Workspace, args: &Value) -> Result<String, ToolError> {
    let (path, new_str) = match (str_arg(args, "path"), str_arg(args, "new_str")) {
        (Some(path), Some(new_str)) => (path, new_str),
        _ => return Err(ToolError::MissingEditInput),
    };
    let old_str = str_arg(args, "old_str");

    if old_str == Some(new_str) {
        return Err(ToolError::IdenticalEdit);
    }

    let full_path = workspace.resolve(path)?;
    let old_str = old_str.unwrap_or("");

    if !full_path.exists() {
        if !old_str.is_empty() {
            return Err(ToolError::EditTargetMissing {
                path: path.to_string(),
            });
        }

        let create_err = |source| ToolError::Create {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(create_err)?;
        }
        fs::write(&full_path, new_str).map_err(create_err)?;

        debug!("Created {}", full_path.display());
        return Ok(format!("Successfully created file {}", path));
    }

    if !full_path.is_file() {
        return Err(ToolError::NotAFile {
            path: path.to_string(),
        });
    }

    let edit_err = |source| ToolError::Edit {
        path: path.to_string(),
        source,
    };
    let original = fs::read_to_string(&full_path).map_err(edit_err)?;

    let modified = if old_str.is_empty() {
        format!("{}{}", original, new_str)
    } else if original.contains(old_str) {
        original.replacen(old_str, new_str, 1)
    } else {
        return Err(ToolError::OldStrNotFound {
            path: path.to_string(),
        });
    };

    fs::write(&full_path, modified).map_err(edit_err)?;
    Ok("OK".to_string())
}

/// The default tool set, in the order it is offered to the model.
pub fn builtin_tools() -> Vec<Tool> {
    vec![
        Tool::new(
            ToolDefinition::function(
                "read_file",
                "Read the contents of a given relative file path. Use this when you want to see what's inside a file. Do not use this with directory names.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The relative path of a file in the working directory."
                        }
                    },
                    "required": ["path"]
                }),
            ),
            read_file,
        ),
        Tool::new(
            ToolDefinition::function(
                "list_files",
                "List files and directories at a given path. If no path is provided, lists files in the current directory. Returns a JSON string array.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Optional relative path to list files from. Defaults to current directory if not provided."
                        }
                    }
                }),
            ),
            list_files,
        ),
        Tool::new(
            ToolDefinition::function(
                "edit_file",
                "Make edits to a text file. Replaces the first occurrence of 'old_str' with 'new_str' in the given file. 'old_str' and 'new_str' MUST be different from each other. If the file specified with path doesn't exist AND 'old_str' is empty, it will be created with 'new_str' as content. If 'old_str' is provided, it must exist in the file. If 'old_str' is empty and file exists, 'new_str' will be appended to the end of the file.",
                json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "The path to the file."
                        },
                        "old_str": {
                            "type": "string",
                            "description": "Text to search for. If creating a new file, this should be empty. If provided, it must exist in the file."
                        },
                        "new_str": {
                            "type": "string",
                            "description": "Text to replace old_str with, or the content for a new file."
                        }
                    },
                    "required": ["path", "new_str"]
                }),
            ),
            edit_file,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FunctionCall;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ToolExecutor) {
        let temp_dir = TempDir::new().unwrap();
        let workspace = Workspace::new(temp_dir.path()).unwrap();
        (temp_dir, ToolExecutor::with_builtin_tools(workspace))
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            function: FunctionCall {
                name: name.to_string(),
                arguments,
            },
        }
    }

    fn error_of(result: &ToolResult) -> String {
        assert!(!result.success, "expected failure, got {:?}", result.output);
        result.error.clone().unwrap_or_default()
    }

    #[test]
    fn test_read_file() {
        let (temp_dir, executor) = setup();
        fs::write(temp_dir.path().join("hello.txt"), "Hello\nWorld\n").unwrap();

        let result = executor.execute(&call("read_file", json!({"path": "hello.txt"})));

        assert!(result.success);
        assert_eq!(result.output, "Hello\nWorld\n");
        assert_eq!(result.content(), "Hello\nWorld\n");
    }

    #[test]
    fn test_read_file_requires_path() {
        let (_temp, executor) = setup();
        let result = executor.execute(&call("read_file", json!({})));
        assert_eq!(error_of(&result), "Path is required.");
    }

    #[test]
    fn test_read_file_on_directory() {
        let (temp_dir, executor) = setup();
        fs::create_dir(temp_dir.path().join("src")).unwrap();

        let result = executor.execute(&call("read_file", json!({"path": "src"})));
        assert!(error_of(&result).starts_with("File not found or is not a regular file"));
    }

    #[test]
    fn test_all_tools_deny_paths_outside_workspace() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("work");
        fs::create_dir(&root).unwrap();
        fs::write(parent.path().join("outside.txt"), "secret").unwrap();
        let executor = ToolExecutor::with_builtin_tools(Workspace::new(&root).unwrap());

        let calls = [
            call("read_file", json!({"path": "../outside.txt"})),
            call("list_files", json!({"path": ".."})),
            call(
                "edit_file",
                json!({"path": "../outside.txt", "old_str": "secret", "new_str": "leak"}),
            ),
            call("edit_file", json!({"path": "../new.txt", "new_str": "x"})),
        ];

        for c in &calls {
            let result = executor.execute(c);
            assert!(
                error_of(&result).contains("is not allowed"),
                "{} was not denied",
                c.function.name
            );
        }

        assert_eq!(
            fs::read_to_string(parent.path().join("outside.txt")).unwrap(),
            "secret"
        );
        assert!(!parent.path().join("new.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_file_through_dangling_symlink_is_denied() {
        let (temp_dir, executor) = setup();
        let outside = TempDir::new().unwrap();
        let planted = outside.path().join("planted.txt");
        std::os::unix::fs::symlink(&planted, temp_dir.path().join("evil")).unwrap();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "evil", "old_str": "", "new_str": "pwned"}),
        ));

        assert!(error_of(&result).contains("is not allowed"));
        assert!(!planted.exists());
    }

    #[test]
    fn test_list_files_defaults_to_root() {
        let (temp_dir, executor) = setup();
        fs::write(temp_dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::create_dir(temp_dir.path().join("src")).unwrap();

        let result = executor.execute(&call("list_files", json!({})));

        assert!(result.success);
        let entries: Vec<String> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(entries, vec!["main.rs", "src/"]);
    }

    #[test]
    fn test_list_files_subdirectory() {
        let (temp_dir, executor) = setup();
        fs::create_dir_all(temp_dir.path().join("src/agent")).unwrap();
        fs::write(temp_dir.path().join("src/lib.rs"), "").unwrap();

        let result = executor.execute(&call("list_files", json!({"path": "src"})));
        assert_eq!(result.output, r#"["agent/","lib.rs"]"#);
    }

    #[test]
    fn test_list_files_missing_path() {
        let (_temp, executor) = setup();
        let result = executor.execute(&call("list_files", json!({"path": "ghost"})));
        assert_eq!(error_of(&result), "Path not found: ghost");
    }

    #[test]
    fn test_edit_creates_missing_file() {
        let (temp_dir, executor) = setup();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "notes/todo.txt", "old_str": "", "new_str": "buy milk"}),
        ));

        assert!(result.success);
        assert_eq!(result.output, "Successfully created file notes/todo.txt");
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("notes/todo.txt")).unwrap(),
            "buy milk"
        );
    }

    #[test]
    fn test_edit_creates_missing_file_without_old_str() {
        let (temp_dir, executor) = setup();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "fresh.txt", "new_str": "hello"}),
        ));

        assert!(result.success);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("fresh.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_edit_missing_file_with_old_str_fails() {
        let (temp_dir, executor) = setup();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "ghost.txt", "old_str": "a", "new_str": "b"}),
        ));

        assert!(error_of(&result).starts_with("File not found: ghost.txt"));
        assert!(!temp_dir.path().join("ghost.txt").exists());
    }

    #[test]
    fn test_edit_appends_when_old_str_empty() {
        let (temp_dir, executor) = setup();
        let file = temp_dir.path().join("log.txt");
        fs::write(&file, "line one\n").unwrap();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "log.txt", "old_str": "", "new_str": "line two\n"}),
        ));

        assert_eq!(result.output, "OK");
        assert_eq!(fs::read_to_string(&file).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_edit_replaces_first_occurrence_only() {
        let (temp_dir, executor) = setup();
        let file = temp_dir.path().join("code.rs");
        fs::write(&file, "let x = 1;\nlet x = 1;\n").unwrap();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "code.rs", "old_str": "x = 1", "new_str": "y = 2"}),
        ));

        assert_eq!(result.output, "OK");
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "let y = 2;\nlet x = 1;\n"
        );
    }

    #[test]
    fn test_edit_old_str_not_found() {
        let (temp_dir, executor) = setup();
        let file = temp_dir.path().join("code.rs");
        fs::write(&file, "fn main() {}").unwrap();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "code.rs", "old_str": "fn helper", "new_str": "fn other"}),
        ));

        assert_eq!(error_of(&result), "'old_str' not found in file code.rs.");
        assert_eq!(fs::read_to_string(&file).unwrap(), "fn main() {}");
    }

    #[test]
    fn test_edit_identical_strings_always_fail() {
        let (temp_dir, executor) = setup();
        fs::write(temp_dir.path().join("same.txt"), "abc").unwrap();

        for args in [
            json!({"path": "same.txt", "old_str": "abc", "new_str": "abc"}),
            json!({"path": "same.txt", "old_str": "", "new_str": ""}),
            json!({"path": "absent.txt", "old_str": "", "new_str": ""}),
        ] {
            let result = executor.execute(&call("edit_file", args));
            assert!(error_of(&result).contains("must be different"));
        }
        assert!(!temp_dir.path().join("absent.txt").exists());
    }

    #[test]
    fn test_edit_requires_path_and_new_str() {
        let (_temp, executor) = setup();
        let result = executor.execute(&call("edit_file", json!({"path": "a.txt"})));
        assert_eq!(
            error_of(&result),
            "Invalid input: 'path' and 'new_str' are required."
        );
    }

    #[test]
    fn test_edit_directory_target() {
        let (temp_dir, executor) = setup();
        fs::create_dir(temp_dir.path().join("dir")).unwrap();

        let result = executor.execute(&call(
            "edit_file",
            json!({"path": "dir", "new_str": "x"}),
        ));
        assert_eq!(error_of(&result), "Path exists but is not a file: dir");
    }

    #[test]
    fn test_unknown_tool() {
        let (_temp, executor) = setup();
        let result = executor.execute(&call("delete_everything", json!({})));

        assert_eq!(
            result.content(),
            r#"{"error":"Tool 'delete_everything' not found by agent."}"#
        );
    }

    #[test]
    fn test_tool_definitions() {
        let (_temp, executor) = setup();
        let names: Vec<_> = executor
            .definitions()
            .iter()
            .map(|d| d.function.name.clone())
            .collect();

        assert_eq!(names, vec!["read_file", "list_files", "edit_file"]);
        let edit = &executor.definitions()[2];
        assert_eq!(
            edit.function.parameters["required"],
            json!(["path", "new_str"])
        );
    }
}
