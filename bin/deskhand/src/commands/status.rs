use deskhand_core::{Config, Paths};
use deskhand_tools::shell::TmuxBackend;

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("deskhand status");
    println!("===============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (not found)" }
    );

    if !config_exists {
        println!();
        println!("Run `deskhand onboard` to initialize.");
        return Ok(());
    }

    let config = Config::load(&config_path)?;
    let workspace = config.workspace_root(&paths);
    println!(
        "Workspace: {} {}",
        workspace.display(),
        if workspace.exists() { "✓" } else { "✗ (not found)" }
    );

    println!();
    println!("Shell:");
    println!("  default timeout: {}s", config.shell.default_timeout_secs);
    println!("  poll interval:   {}s", config.shell.poll_interval_secs);
    println!("Desktop:");
    println!("  display:         {}", config.desktop.display);
    println!("Browser service:");
    println!("  base url:        {}", config.browser.base_url);

    // Live sessions, if a tmux server is up
    println!();
    let backend = TmuxBackend::new();
    match backend.list_sessions().await {
        Ok(sessions) if sessions.is_empty() => {
            println!("Sessions:  none");
        }
        Ok(sessions) => {
            println!("Sessions:  {} live", sessions.len());
            for name in sessions {
                println!("  {}", name);
            }
        }
        Err(e) => {
            println!("Sessions:  unavailable ({})", e);
        }
    }

    Ok(())
}
