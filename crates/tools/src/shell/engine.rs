//! Persistent command-session engine.
//!
//! Commands are dispatched into named, durable tmux sessions and completion
//! is detected by a sentinel line echoed once the command returns control to
//! the shell. Every dispatch gets a fresh marker and a capture baseline, so a
//! session reused across commands can never report a stale completion from
//! scroll-back. The backend is the sole source of truth for which sessions
//! exist; this engine only tracks its own in-flight dispatches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use deskhand_core::{Error, Result};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use super::tmux::TmuxBackend;

/// What an execute/check call observed about a session.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub session_name: String,
    pub output: Option<String>,
    pub completed: bool,
}

/// The most recent dispatch into a session: its sentinel and how long the
/// captured buffer was when the command was sent. Retired when a later
/// execute observes completion, the session is terminated, or a blocking
/// wait finishes.
#[derive(Debug, Clone)]
struct Dispatch {
    marker: String,
    baseline: usize,
}

pub struct ShellEngine {
    backend: TmuxBackend,
    workspace: PathBuf,
    poll_interval: Duration,
    dispatches: Mutex<HashMap<String, Dispatch>>,
}

impl ShellEngine {
    pub fn new(backend: TmuxBackend, workspace: PathBuf, poll_interval: Duration) -> Self {
        Self {
            backend,
            workspace,
            poll_interval,
            dispatches: Mutex::new(HashMap::new()),
        }
    }

    /// Dispatch `command` into the named session, creating the session if
    /// needed. Non-blocking calls return straight away; blocking calls poll
    /// until the sentinel appears, `timeout` elapses, or `cancel` fires.
    /// Timeout and cancellation leave the session running for a later check;
    /// observed completion kills it.
    pub async fn execute_command(
        &self,
        command: &str,
        folder: Option<&str>,
        session_name: Option<&str>,
        blocking: bool,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ExecOutcome> {
        let name = match session_name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => generate_session_name(),
        };
        let folder = folder.filter(|f| !f.trim().is_empty());

        // Effective working directory, created up front so a failure here
        // never leaves a fresh session behind.
        let dir = match folder {
            Some(f) => self.workspace.join(f),
            None => self.workspace.clone(),
        };
        std::fs::create_dir_all(&dir)
            .map_err(|e| Error::DirectoryCreation(format!("{}: {}", dir.display(), e)))?;

        // The whole dispatch sequence runs under the map lock so two callers
        // can never interleave commands into the same session. The blocking
        // poll below runs unlocked.
        let (marker, baseline) = {
            let mut dispatches = self.dispatches.lock().await;

            if self.backend.has_session(&name).await? {
                let lines = self.backend.capture_output(&name).await?;
                match dispatches.get(&name) {
                    // The previous command has finished since we last looked.
                    Some(prev) if find_marker(&lines, prev.baseline, &prev.marker).is_some() => {
                        dispatches.remove(&name);
                    }
                    Some(_) => {
                        return Err(Error::SessionBusy(format!(
                            "session '{}' is still running a command; check or terminate it first",
                            name
                        )));
                    }
                    None => {}
                }
            } else {
                self.backend.create_session(&name, &dir).await?;
                // Name reused after an external kill; drop any stale record.
                dispatches.remove(&name);
            }

            let marker = format!("__deskhand_done_{}", Uuid::new_v4().simple());
            let baseline = self.backend.capture_output(&name).await?.len();
            let text = build_dispatch(command, folder.map(|_| dir.as_path()), &marker);
            self.backend.send_text(&name, &text).await?;
            debug!(session = %name, blocking, "command dispatched");
            dispatches.insert(
                name.clone(),
                Dispatch {
                    marker: marker.clone(),
                    baseline,
                },
            );
            (marker, baseline)
        };

        if !blocking {
            return Ok(ExecOutcome {
                session_name: name,
                output: None,
                completed: false,
            });
        }

        self.wait_for_completion(&name, &marker, baseline, timeout, cancel)
            .await
    }

    /// Read the session's transcript without side effects. Repeated checks
    /// return the same answer until the session's state actually changes.
    pub async fn check_command_output(&self, session_name: &str) -> Result<ExecOutcome> {
        if !self.backend.has_session(session_name).await? {
            return Err(Error::SessionNotFound(session_name.to_string()));
        }
        let lines = self.backend.capture_output(session_name).await?;
        let dispatches = self.dispatches.lock().await;
        let outcome = match dispatches.get(session_name) {
            Some(d) => match find_marker(&lines, d.baseline, &d.marker) {
                Some(idx) => ExecOutcome {
                    session_name: session_name.to_string(),
                    output: Some(join_window(&lines, d.baseline, idx)),
                    completed: true,
                },
                None => ExecOutcome {
                    session_name: session_name.to_string(),
                    output: Some(join_window(&lines, d.baseline, lines.len())),
                    completed: false,
                },
            },
            // Session exists but nothing was dispatched through this engine
            // (another process, or someone's own tmux). Whole transcript.
            None => ExecOutcome {
                session_name: session_name.to_string(),
                output: Some(lines.join("\n")),
                completed: false,
            },
        };
        Ok(outcome)
    }

    /// Kill the session. The name becomes free for reuse.
    pub async fn terminate_command(&self, session_name: &str) -> Result<()> {
        if !self.backend.has_session(session_name).await? {
            return Err(Error::SessionNotFound(session_name.to_string()));
        }
        self.backend.kill_session(session_name).await?;
        self.dispatches.lock().await.remove(session_name);
        info!(session = %session_name, "session terminated");
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<String>> {
        self.backend.list_sessions().await
    }

    async fn wait_for_completion(
        &self,
        name: &str,
        marker: &str,
        baseline: usize,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ExecOutcome> {
        let started = Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => {
                    info!(session = %name, "blocking wait cancelled; command left running");
                    return Ok(ExecOutcome {
                        session_name: name.to_string(),
                        output: None,
                        completed: false,
                    });
                }
            }

            let lines = self.backend.capture_output(name).await?;
            if let Some(idx) = find_marker(&lines, baseline, marker) {
                let output = join_window(&lines, baseline, idx);
                self.backend.kill_session(name).await?;
                self.dispatches.lock().await.remove(name);
                return Ok(ExecOutcome {
                    session_name: name.to_string(),
                    output: Some(output),
                    completed: true,
                });
            }

            if started.elapsed() >= timeout {
                info!(
                    session = %name,
                    timeout_secs = timeout.as_secs(),
                    "blocking wait timed out; command left running"
                );
                return Ok(ExecOutcome {
                    session_name: name.to_string(),
                    output: None,
                    completed: false,
                });
            }
        }
    }
}

fn generate_session_name() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("session_{}", &hex[..8])
}

/// Assemble the line typed into the shell. The sentinel is echoed as two
/// concatenated halves so the typed line itself never shows the marker as a
/// contiguous token; only the command finishing emits it as a whole line.
fn build_dispatch(command: &str, dir: Option<&Path>, marker: &str) -> String {
    let (head, tail) = marker.split_at(marker.len() / 2);
    let echo = format!("echo \"{}\"\"{}\"", head, tail);
    match dir {
        Some(d) => format!(
            "cd {} && {}; {}",
            shell_quote(&d.to_string_lossy()),
            command,
            echo
        ),
        None => format!("{}; {}", command, echo),
    }
}

/// Index of the first line at or after `baseline` equal to the marker after
/// trimming. Marker uniqueness per dispatch makes a hit unambiguous.
fn find_marker(lines: &[String], baseline: usize, marker: &str) -> Option<usize> {
    let start = baseline.min(lines.len());
    lines[start..]
        .iter()
        .position(|l| l.trim() == marker)
        .map(|i| start + i)
}

/// The transcript window `[start, end)` for one dispatch, newline-joined.
fn join_window(lines: &[String], start: usize, end: usize) -> String {
    let start = start.min(lines.len());
    let end = end.clamp(start, lines.len());
    lines[start..end].join("\n")
}

/// Single-quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_generate_session_name() {
        let a = generate_session_name();
        let b = generate_session_name();
        assert!(a.starts_with("session_"));
        assert_eq!(a.len(), "session_".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_find_marker_respects_baseline() {
        let buf = lines(&["__m__", "out", "  __m__  ", "more"]);
        // Stale occurrence before the baseline is ignored
        assert_eq!(find_marker(&buf, 1, "__m__"), Some(2));
        assert_eq!(find_marker(&buf, 0, "__m__"), Some(0));
        assert_eq!(find_marker(&buf, 3, "__m__"), None);
        // Baseline past the end is tolerated
        assert_eq!(find_marker(&buf, 10, "__m__"), None);
    }

    #[test]
    fn test_find_marker_requires_full_line() {
        let buf = lines(&["echo \"__m_\"\"_x\"", "__m__x"]);
        // The typed echo line shows the split halves, not the marker
        assert_eq!(find_marker(&buf, 0, "__m__x"), Some(1));
    }

    #[test]
    fn test_join_window() {
        let buf = lines(&["a", "b", "c", "d"]);
        assert_eq!(join_window(&buf, 1, 3), "b\nc");
        assert_eq!(join_window(&buf, 0, 0), "");
        assert_eq!(join_window(&buf, 2, 100), "c\nd");
        assert_eq!(join_window(&buf, 100, 2), "");
    }

    #[test]
    fn test_build_dispatch_without_folder() {
        let text = build_dispatch("ls -la", None, "__deskhand_done_abc123");
        assert!(text.starts_with("ls -la; echo "));
        // The contiguous marker must not appear in the typed line
        assert!(!text.contains("__deskhand_done_abc123"));
        assert!(text.contains("\"\""));
    }

    #[test]
    fn test_build_dispatch_with_folder() {
        let text = build_dispatch(
            "make test",
            Some(Path::new("/work/my proj")),
            "__deskhand_done_abc123",
        );
        assert!(text.starts_with("cd '/work/my proj' && make test; echo "));
        assert!(!text.contains("__deskhand_done_abc123"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/plain/path"), "'/plain/path'");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    /// End-to-end blocking dispatch against a real tmux server. Run with
    /// `cargo test -- --ignored` on a host that has tmux installed.
    #[tokio::test]
    #[ignore]
    async fn test_blocking_echo_live() {
        let workspace = tempfile::tempdir().unwrap();
        let engine = ShellEngine::new(
            TmuxBackend::new(),
            workspace.path().to_path_buf(),
            Duration::from_millis(200),
        );

        let outcome = engine
            .execute_command(
                "echo hi",
                None,
                None,
                true,
                Duration::from_secs(10),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(outcome.completed);
        let output = outcome.output.unwrap();
        assert!(output.contains("hi"));
        // The sentinel line itself is excluded from the returned window;
        // the typed echo line only ever shows the split halves.
        assert!(!output.lines().any(|l| {
            let t = l.trim();
            t.starts_with("__deskhand_done_") && t.len() == "__deskhand_done_".len() + 32
        }));
        // Completion kills the session
        assert!(!engine
            .list_sessions()
            .await
            .unwrap()
            .contains(&outcome.session_name));
    }
}
