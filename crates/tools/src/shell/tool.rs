//! ShellTool — JSON façade over the command-session engine.

use async_trait::async_trait;
use deskhand_core::{Error, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{safe_truncate, Tool, ToolContext, ToolSchema};
use super::engine::{ExecOutcome, ShellEngine};
use super::tmux::TmuxBackend;

/// Captures returned to the model are capped; the full transcript stays in
/// the tmux scroll-back.
const MAX_OUTPUT_CHARS: usize = 50_000;

/// Global engine (daemon model — in-flight dispatch records persist across
/// tool calls).
static ENGINE: once_cell::sync::Lazy<Arc<Mutex<Option<Arc<ShellEngine>>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(Mutex::new(None)));

async fn ensure_engine(ctx: &ToolContext) -> Arc<ShellEngine> {
    let mut guard = ENGINE.lock().await;
    match guard.as_ref() {
        Some(engine) => engine.clone(),
        None => {
            let engine = Arc::new(ShellEngine::new(
                TmuxBackend::new(),
                ctx.workspace.clone(),
                Duration::from_secs(ctx.config.shell.poll_interval_secs),
            ));
            *guard = Some(engine.clone());
            engine
        }
    }
}

/// One request variant per action, each carrying only its own fields.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ShellRequest {
    ExecuteCommand {
        command: String,
        #[serde(default)]
        folder: Option<String>,
        #[serde(default)]
        session_name: Option<String>,
        #[serde(default)]
        blocking: bool,
        #[serde(default)]
        timeout: Option<u64>,
    },
    CheckCommandOutput {
        session_name: String,
    },
    TerminateCommand {
        session_name: String,
    },
    ListSessions {},
}

pub struct ShellTool;

#[async_trait]
impl Tool for ShellTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "shell",
            description: "Execute shell commands in the workspace directory. Commands are non-blocking by default and run in durable tmux sessions, ideal for long-running operations like servers or builds. Use named sessions to keep state between related commands; poll with check_command_output and clean up with terminate_command.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": ["execute_command", "check_command_output", "terminate_command", "list_sessions"],
                        "description": "The shell action to perform"
                    },
                    "command": {
                        "type": "string",
                        "description": "(execute_command) The shell command to run. May be chained with &&, || and | operators."
                    },
                    "folder": {
                        "type": "string",
                        "description": "(execute_command) Optional path relative to the workspace root to run the command in. Created if it does not exist."
                    },
                    "session_name": {
                        "type": "string",
                        "description": "Name of the tmux session. Required for check_command_output and terminate_command; optional for execute_command (a random session_<hex> name is generated when omitted)."
                    },
                    "blocking": {
                        "type": "boolean",
                        "description": "(execute_command) Wait for the command to finish. Default false."
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "(execute_command) Timeout in seconds for blocking calls, default 60. Ignored when blocking is false."
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        parse_request(params).map(|_| ())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let request = parse_request(&params)?;
        let engine = ensure_engine(&ctx).await;

        match request {
            ShellRequest::ExecuteCommand {
                command,
                folder,
                session_name,
                blocking,
                timeout,
            } => {
                let timeout =
                    Duration::from_secs(timeout.unwrap_or(ctx.config.shell.default_timeout_secs));
                let outcome = engine
                    .execute_command(
                        &command,
                        folder.as_deref(),
                        session_name.as_deref(),
                        blocking,
                        timeout,
                        CancellationToken::new(),
                    )
                    .await?;
                Ok(outcome_json(outcome))
            }
            ShellRequest::CheckCommandOutput { session_name } => {
                let outcome = engine.check_command_output(&session_name).await?;
                Ok(outcome_json(outcome))
            }
            ShellRequest::TerminateCommand { session_name } => {
                engine.terminate_command(&session_name).await?;
                Ok(json!({
                    "session_name": session_name,
                    "output": Value::Null,
                    "completed": true
                }))
            }
            ShellRequest::ListSessions {} => {
                let names = engine.list_sessions().await?;
                Ok(json!({
                    "session_name": Value::Null,
                    "output": names.join("\n"),
                    "completed": true,
                    "sessions": names
                }))
            }
        }
    }
}

fn parse_request(params: &Value) -> Result<ShellRequest> {
    let request: ShellRequest = serde_json::from_value(params.clone())
        .map_err(|e| Error::Validation(format!("Invalid shell request: {}", e)))?;
    if let ShellRequest::ExecuteCommand { command, .. } = &request {
        if command.trim().is_empty() {
            return Err(Error::Validation("command must not be empty".to_string()));
        }
    }
    Ok(request)
}

fn outcome_json(outcome: ExecOutcome) -> Value {
    json!({
        "session_name": outcome.session_name,
        "output": outcome.output.as_deref().map(|o| safe_truncate(o, MAX_OUTPUT_CHARS)),
        "completed": outcome.completed
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = ShellTool;
        let schema = tool.schema();
        assert_eq!(schema.name, "shell");
        let actions = schema.parameters["properties"]["action"]["enum"]
            .as_array()
            .unwrap()
            .len();
        assert_eq!(actions, 4);
    }

    #[test]
    fn test_validate_execute_command() {
        let tool = ShellTool;
        assert!(tool
            .validate(&json!({"action": "execute_command", "command": "echo hi"}))
            .is_ok());
        assert!(tool
            .validate(&json!({
                "action": "execute_command",
                "command": "make build",
                "folder": "proj",
                "session_name": "build",
                "blocking": true,
                "timeout": 120
            }))
            .is_ok());
        // Missing command
        assert!(tool.validate(&json!({"action": "execute_command"})).is_err());
        // Empty command
        assert!(tool
            .validate(&json!({"action": "execute_command", "command": "  "}))
            .is_err());
    }

    #[test]
    fn test_validate_check_and_terminate_need_session() {
        let tool = ShellTool;
        assert!(tool
            .validate(&json!({"action": "check_command_output", "session_name": "s1"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "check_command_output"})).is_err());
        assert!(tool
            .validate(&json!({"action": "terminate_command", "session_name": "s1"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "terminate_command"})).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_action() {
        let tool = ShellTool;
        assert!(tool.validate(&json!({"action": "reboot"})).is_err());
        assert!(tool.validate(&json!({})).is_err());
    }

    #[test]
    fn test_validate_list_sessions() {
        let tool = ShellTool;
        assert!(tool.validate(&json!({"action": "list_sessions"})).is_ok());
    }

    #[test]
    fn test_outcome_json_shape() {
        let v = outcome_json(ExecOutcome {
            session_name: "s1".to_string(),
            output: Some("hi".to_string()),
            completed: true,
        });
        assert_eq!(v["session_name"], "s1");
        assert_eq!(v["output"], "hi");
        assert_eq!(v["completed"], true);

        let v = outcome_json(ExecOutcome {
            session_name: "s2".to_string(),
            output: None,
            completed: false,
        });
        assert!(v["output"].is_null());
        assert_eq!(v["completed"], false);
    }
}
