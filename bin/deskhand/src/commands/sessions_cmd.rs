use deskhand_core::{Config, Paths};
use deskhand_tools::shell::{ShellEngine, TmuxBackend};
use std::time::Duration;

fn engine() -> anyhow::Result<ShellEngine> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    let workspace = config.workspace_root(&paths);
    Ok(ShellEngine::new(
        TmuxBackend::new(),
        workspace,
        Duration::from_secs(config.shell.poll_interval_secs),
    ))
}

/// List live command sessions.
pub async fn list() -> anyhow::Result<()> {
    let sessions = engine()?.list_sessions().await?;

    if sessions.is_empty() {
        println!("No live sessions.");
        return Ok(());
    }

    println!("Live sessions ({}):", sessions.len());
    for name in sessions {
        println!("  {}", name);
    }
    Ok(())
}

/// Kill a command session by name.
pub async fn kill(name: &str) -> anyhow::Result<()> {
    engine()?.terminate_command(name).await?;
    println!("✓ Session '{}' terminated", name);
    Ok(())
}
