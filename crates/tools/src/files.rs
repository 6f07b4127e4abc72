//! FilesTool — workspace-rooted file operations.

use async_trait::async_trait;
use deskhand_core::{Error, Result};
use serde_json::{json, Value};
use std::path::Path;

use crate::{expand_path, Tool, ToolContext, ToolSchema};

pub struct FilesTool;

#[async_trait]
impl Tool for FilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "files",
            description: "File operations rooted at the workspace: read, write/append, list directories, copy, move, delete, and glob search. Relative paths resolve under the workspace root.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "action": {
                        "type": "string",
                        "enum": [
                            "read_file", "write_file", "list_directory", "copy_file",
                            "move_file", "delete_file", "file_search"
                        ],
                        "description": "Action to perform"
                    },
                    "path": {
                        "type": "string",
                        "description": "Target path (read/write/delete), or directory for list_directory/file_search. Defaults to the workspace root for list_directory and file_search."
                    },
                    "content": {
                        "type": "string",
                        "description": "(write_file) Content to write"
                    },
                    "append": {
                        "type": "boolean",
                        "description": "(write_file) Append instead of overwrite, default false"
                    },
                    "source": {
                        "type": "string",
                        "description": "(copy_file/move_file) Source path"
                    },
                    "destination": {
                        "type": "string",
                        "description": "(copy_file/move_file) Destination path"
                    },
                    "pattern": {
                        "type": "string",
                        "description": "(file_search) Glob pattern matched against file names, e.g. '*.csv' or 'logs/**/*.txt'"
                    }
                },
                "required": ["action"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let action = params
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Validation("Missing required parameter: action".to_string()))?;

        match action {
            "read_file" | "delete_file" => {
                if params.get("path").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("Missing required parameter: path".to_string()));
                }
            }
            "write_file" => {
                if params.get("path").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("Missing required parameter: path".to_string()));
                }
                if params.get("content").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("Missing required parameter: content".to_string()));
                }
            }
            "copy_file" | "move_file" => {
                if params.get("source").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("Missing required parameter: source".to_string()));
                }
                if params.get("destination").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation(
                        "Missing required parameter: destination".to_string(),
                    ));
                }
            }
            "file_search" => {
                if params.get("pattern").and_then(|v| v.as_str()).is_none() {
                    return Err(Error::Validation("Missing required parameter: pattern".to_string()));
                }
            }
            "list_directory" => {}
            _ => {
                return Err(Error::Validation(format!("Unknown action: {}", action)));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let action = params["action"].as_str().unwrap_or("");
        let workspace = ctx.workspace.clone();

        match action {
            "read_file" => action_read(&workspace, &params).await,
            "write_file" => action_write(&workspace, &params).await,
            "list_directory" => action_list(&workspace, &params).await,
            "copy_file" => action_copy(&workspace, &params).await,
            "move_file" => action_move(&workspace, &params).await,
            "delete_file" => action_delete(&workspace, &params).await,
            "file_search" => {
                let ws = workspace.clone();
                let p = params.clone();
                // glob walks the tree synchronously
                tokio::task::spawn_blocking(move || action_search(&ws, &p))
                    .await
                    .map_err(|e| Error::Tool(format!("Search task failed: {}", e)))?
            }
            _ => Err(Error::Tool(format!("Unknown action: {}", action))),
        }
    }
}

async fn action_read(workspace: &Path, params: &Value) -> Result<Value> {
    let path = expand_path(params["path"].as_str().unwrap_or(""), workspace);
    if !path.exists() {
        return Err(Error::NotFound(format!("File not found: {}", path.display())));
    }
    if !path.is_file() {
        return Err(Error::Tool(format!("Not a file: {}", path.display())));
    }
    let content = tokio::fs::read_to_string(&path).await?;
    Ok(json!({
        "path": path.display().to_string(),
        "content": content
    }))
}

async fn action_write(workspace: &Path, params: &Value) -> Result<Value> {
    let path = expand_path(params["path"].as_str().unwrap_or(""), workspace);
    let content = params["content"].as_str().unwrap_or("");
    let append = params.get("append").and_then(|v| v.as_bool()).unwrap_or(false);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    if append {
        let mut existing = if path.exists() {
            tokio::fs::read_to_string(&path).await?
        } else {
            String::new()
        };
        existing.push_str(content);
        tokio::fs::write(&path, &existing).await?;
    } else {
        tokio::fs::write(&path, content).await?;
    }

    Ok(json!({
        "path": path.display().to_string(),
        "bytes_written": content.len(),
        "appended": append
    }))
}

async fn action_list(workspace: &Path, params: &Value) -> Result<Value> {
    let path = match params.get("path").and_then(|v| v.as_str()) {
        Some(p) if !p.is_empty() => expand_path(p, workspace),
        _ => workspace.to_path_buf(),
    };
    if !path.exists() {
        return Err(Error::NotFound(format!("Directory not found: {}", path.display())));
    }
    if !path.is_dir() {
        return Err(Error::Tool(format!("Not a directory: {}", path.display())));
    }

    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(&path).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        let file_type = entry.file_type().await?;
        let kind = if file_type.is_dir() {
            "directory"
        } else if file_type.is_file() {
            "file"
        } else {
            "other"
        };
        entries.push(json!({ "name": name, "type": kind }));
    }

    Ok(json!({
        "path": path.display().to_string(),
        "entries": entries
    }))
}

async fn action_copy(workspace: &Path, params: &Value) -> Result<Value> {
    let source = expand_path(params["source"].as_str().unwrap_or(""), workspace);
    let destination = expand_path(params["destination"].as_str().unwrap_or(""), workspace);
    if !source.exists() {
        return Err(Error::NotFound(format!("Source not found: {}", source.display())));
    }
    if !source.is_file() {
        return Err(Error::Tool(format!("Not a file: {}", source.display())));
    }
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(&source, &destination).await?;
    Ok(json!({
        "source": source.display().to_string(),
        "destination": destination.display().to_string(),
        "status": "copied"
    }))
}

async fn action_move(workspace: &Path, params: &Value) -> Result<Value> {
    let source = expand_path(params["source"].as_str().unwrap_or(""), workspace);
    let destination = expand_path(params["destination"].as_str().unwrap_or(""), workspace);
    if !source.exists() {
        return Err(Error::NotFound(format!("Source not found: {}", source.display())));
    }
    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(&source, &destination).await?;
    Ok(json!({
        "source": source.display().to_string(),
        "destination": destination.display().to_string(),
        "status": "moved"
    }))
}

async fn action_delete(workspace: &Path, params: &Value) -> Result<Value> {
    let path = expand_path(params["path"].as_str().unwrap_or(""), workspace);
    if !path.exists() {
        return Err(Error::NotFound(format!("File not found: {}", path.display())));
    }
    if !path.is_file() {
        return Err(Error::Tool(format!(
            "Not a file: {} (directories are not deleted by this tool)",
            path.display()
        )));
    }
    tokio::fs::remove_file(&path).await?;
    Ok(json!({
        "path": path.display().to_string(),
        "status": "deleted"
    }))
}

fn action_search(workspace: &Path, params: &Value) -> Result<Value> {
    let pattern = params["pattern"].as_str().unwrap_or("");
    let base = match params.get("path").and_then(|v| v.as_str()) {
        Some(p) if !p.is_empty() => expand_path(p, workspace),
        _ => workspace.to_path_buf(),
    };
    if !base.is_dir() {
        return Err(Error::NotFound(format!("Directory not found: {}", base.display())));
    }

    // Bare name patterns search the whole subtree
    let full_pattern = if pattern.contains('/') {
        base.join(pattern)
    } else {
        base.join("**").join(pattern)
    };
    let full_pattern = full_pattern.to_string_lossy().to_string();

    let mut matches = Vec::new();
    let paths = glob::glob(&full_pattern)
        .map_err(|e| Error::Validation(format!("Invalid glob pattern: {}", e)))?;
    for entry in paths {
        match entry {
            Ok(p) if p.is_file() => matches.push(p.display().to_string()),
            _ => {}
        }
    }
    matches.sort();
    let count = matches.len();

    Ok(json!({
        "pattern": pattern,
        "path": base.display().to_string(),
        "matches": matches,
        "count": count
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema() {
        let tool = FilesTool;
        let schema = tool.schema();
        assert_eq!(schema.name, "files");
        assert_eq!(
            schema.parameters["properties"]["action"]["enum"]
                .as_array()
                .unwrap()
                .len(),
            7
        );
    }

    #[test]
    fn test_validate_per_action() {
        let tool = FilesTool;
        assert!(tool.validate(&json!({"action": "read_file", "path": "a.txt"})).is_ok());
        assert!(tool.validate(&json!({"action": "read_file"})).is_err());
        assert!(tool
            .validate(&json!({"action": "write_file", "path": "a.txt", "content": "hi"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "write_file", "path": "a.txt"})).is_err());
        assert!(tool
            .validate(&json!({"action": "copy_file", "source": "a", "destination": "b"}))
            .is_ok());
        assert!(tool.validate(&json!({"action": "move_file", "source": "a"})).is_err());
        assert!(tool.validate(&json!({"action": "file_search", "pattern": "*.txt"})).is_ok());
        assert!(tool.validate(&json!({"action": "file_search"})).is_err());
        assert!(tool.validate(&json!({"action": "list_directory"})).is_ok());
        assert!(tool.validate(&json!({"action": "shred"})).is_err());
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();

        let out = action_write(ws, &json!({"path": "notes/a.txt", "content": "hello"}))
            .await
            .unwrap();
        assert_eq!(out["bytes_written"], 5);

        let read = action_read(ws, &json!({"path": "notes/a.txt"})).await.unwrap();
        assert_eq!(read["content"], "hello");
    }

    #[tokio::test]
    async fn test_write_append() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();

        action_write(ws, &json!({"path": "log.txt", "content": "one\n"}))
            .await
            .unwrap();
        action_write(ws, &json!({"path": "log.txt", "content": "two\n", "append": true}))
            .await
            .unwrap();

        let read = action_read(ws, &json!({"path": "log.txt"})).await.unwrap();
        assert_eq!(read["content"], "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_copy_move_delete() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();
        action_write(ws, &json!({"path": "src.txt", "content": "data"}))
            .await
            .unwrap();

        action_copy(ws, &json!({"source": "src.txt", "destination": "copy.txt"}))
            .await
            .unwrap();
        assert!(ws.join("copy.txt").exists());
        assert!(ws.join("src.txt").exists());

        action_move(ws, &json!({"source": "copy.txt", "destination": "moved.txt"}))
            .await
            .unwrap();
        assert!(!ws.join("copy.txt").exists());
        assert!(ws.join("moved.txt").exists());

        action_delete(ws, &json!({"path": "moved.txt"})).await.unwrap();
        assert!(!ws.join("moved.txt").exists());

        // Second delete reports not found
        assert!(action_delete(ws, &json!({"path": "moved.txt"})).await.is_err());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();
        action_write(ws, &json!({"path": "a.txt", "content": ""})).await.unwrap();
        std::fs::create_dir(ws.join("sub")).unwrap();

        let out = action_list(ws, &json!({})).await.unwrap();
        let entries = out["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_search_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let ws = dir.path();
        std::fs::create_dir_all(ws.join("deep/deeper")).unwrap();
        std::fs::write(ws.join("top.csv"), "").unwrap();
        std::fs::write(ws.join("deep/deeper/nested.csv"), "").unwrap();
        std::fs::write(ws.join("deep/other.txt"), "").unwrap();

        let out = action_search(ws, &json!({"pattern": "*.csv"})).unwrap();
        assert_eq!(out["count"], 2);

        let out = action_search(ws, &json!({"pattern": "*.txt"})).unwrap();
        assert_eq!(out["count"], 1);
    }
}
