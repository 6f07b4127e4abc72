//! Thin driver over the tmux CLI. Each call shells out to `tmux` and maps
//! failures onto the backend error surface; no state is kept here.

use deskhand_core::{Error, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// New sessions get a wide pane so long lines wrap less in captures.
const SESSION_WIDTH: &str = "200";
const SESSION_HEIGHT: &str = "50";

#[derive(Debug, Clone, Default)]
pub struct TmuxBackend;

impl TmuxBackend {
    pub fn new() -> Self {
        Self
    }

    /// Verify the tmux binary is present and runnable. Returns its version line.
    pub async fn probe(&self) -> Result<String> {
        let output = self.run(&["-V"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Names of all live sessions. A missing server means no sessions.
    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        let output = self.raw(&["list-sessions", "-F", "#{session_name}"]).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("no server running") || stderr.contains("error connecting") {
                return Ok(Vec::new());
            }
            return Err(Error::Backend(format!(
                "tmux list-sessions failed: {}",
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }

    pub async fn has_session(&self, name: &str) -> Result<bool> {
        let output = self.raw(&["has-session", "-t", &exact(name)]).await?;
        Ok(output.status.success())
    }

    pub async fn create_session(&self, name: &str, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        self.run(&[
            "new-session", "-d", "-s", name, "-c", &dir, "-x", SESSION_WIDTH, "-y", SESSION_HEIGHT,
        ])
        .await?;
        Ok(())
    }

    /// Type `text` into the session's active pane, then press Enter.
    /// `-l` sends the text literally so key-name lookup never mangles it.
    pub async fn send_text(&self, name: &str, text: &str) -> Result<()> {
        let target = pane(name);
        self.run(&["send-keys", "-t", &target, "-l", text]).await?;
        self.run(&["send-keys", "-t", &target, "Enter"]).await?;
        Ok(())
    }

    /// Capture the pane buffer as lines. `-S -` starts at the top of the
    /// scroll-back so captured content only ever grows; `-J` re-joins lines
    /// the pane width wrapped. The pane's unused rows come back as trailing
    /// blanks; those are stripped so line counts track real content.
    pub async fn capture_output(&self, name: &str) -> Result<Vec<String>> {
        let output = self
            .run(&["capture-pane", "-p", "-J", "-t", &pane(name), "-S", "-"])
            .await?;
        let mut lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.to_string())
            .collect();
        trim_trailing_blanks(&mut lines);
        Ok(lines)
    }

    pub async fn kill_session(&self, name: &str) -> Result<()> {
        self.run(&["kill-session", "-t", &exact(name)]).await?;
        Ok(())
    }

    async fn raw(&self, args: &[&str]) -> Result<std::process::Output> {
        debug!(args = ?args, "tmux");
        Command::new("tmux")
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Backend(format!("cannot run tmux: {}", e)))
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        let output = self.raw(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Backend(format!(
                "tmux {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(output)
    }
}

/// tmux `-t` targets are prefix-matched by default; a leading `=` forces
/// an exact name match so `build` never resolves to `build-2`. This form
/// only names a session, so it is valid for session-level commands
/// (`has-session`, `kill-session`).
fn exact(name: &str) -> String {
    format!("={}", name)
}

/// Target for pane-level commands (`send-keys`, `capture-pane`). These need
/// a window part after the session name or tmux reports "can't find pane";
/// the trailing colon selects the session's current window and pane.
fn pane(name: &str) -> String {
    format!("={}:", name)
}

fn trim_trailing_blanks(lines: &mut Vec<String>) {
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_target() {
        assert_eq!(exact("build"), "=build");
        assert_eq!(exact("session_ab12cd34"), "=session_ab12cd34");
    }

    #[test]
    fn test_pane_target() {
        assert_eq!(pane("build"), "=build:");
        assert_eq!(pane("session_ab12cd34"), "=session_ab12cd34:");
    }

    #[test]
    fn test_trim_trailing_blanks() {
        let mut buf: Vec<String> = ["$ echo hi", "hi", "", "   ", ""]
            .iter()
            .map(|s| s.to_string())
            .collect();
        trim_trailing_blanks(&mut buf);
        assert_eq!(buf, vec!["$ echo hi".to_string(), "hi".to_string()]);

        // Interior blank lines are real content and stay put
        let mut buf: Vec<String> = ["a", "", "b", ""].iter().map(|s| s.to_string()).collect();
        trim_trailing_blanks(&mut buf);
        assert_eq!(buf.len(), 3);

        let mut empty: Vec<String> = vec!["".to_string(), "  ".to_string()];
        trim_trailing_blanks(&mut empty);
        assert!(empty.is_empty());
    }
}
