//! Persistent shell command sessions over tmux.

pub mod engine;
pub mod tmux;
pub mod tool;

pub use engine::{ExecOutcome, ShellEngine};
pub use tmux::TmuxBackend;
pub use tool::ShellTool;
