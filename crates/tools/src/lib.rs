pub mod browser;
pub mod computer;
pub mod files;
pub mod registry;
pub mod shell;
pub mod vision;

use async_trait::async_trait;
use deskhand_core::{Config, Result};
use serde_json::Value;
use std::path::PathBuf;

pub use registry::ToolRegistry;

/// Truncate a string to at most `max_chars` bytes, backing off to the
/// nearest UTF-8 char boundary.
pub fn safe_truncate(s: &str, max_chars: usize) -> &str {
    if s.len() <= max_chars {
        return s;
    }
    // Find the last valid char boundary at or before max_chars bytes
    let mut end = max_chars;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Resolve a caller-supplied path: `~/` expands to the home directory,
/// absolute paths pass through, everything else is workspace-relative.
pub fn expand_path(path: &str, workspace: &std::path::Path) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else if path.starts_with('/') {
        PathBuf::from(path)
    } else {
        workspace.join(path)
    }
}

#[derive(Clone)]
pub struct ToolContext {
    pub workspace: PathBuf,
    pub config: Config,
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("hello", 10), "hello");
        assert_eq!(safe_truncate("hello", 3), "hel");
    }

    #[test]
    fn test_safe_truncate_multibyte() {
        // Each char is 3 bytes; cutting mid-char must back off to a boundary
        let s = "日本語";
        assert_eq!(safe_truncate(s, 4), "日");
        assert_eq!(safe_truncate(s, 6), "日本");
        assert_eq!(safe_truncate(s, 100), "日本語");
    }

    #[test]
    fn test_expand_path() {
        let ws = std::path::Path::new("/work");
        assert_eq!(expand_path("/etc/hosts", ws), PathBuf::from("/etc/hosts"));
        assert_eq!(expand_path("notes/a.txt", ws), PathBuf::from("/work/notes/a.txt"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/x", ws), home.join("x"));
        }
    }
}
