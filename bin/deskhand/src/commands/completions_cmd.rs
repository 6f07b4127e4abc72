use clap_complete::{generate, Shell};

/// Generate shell completion scripts.
///
/// Re-creates a minimal CLI definition to generate completions without a
/// circular dependency on the main Cli struct.
pub async fn run(shell: &str) -> anyhow::Result<()> {
    let shell = match shell.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" | "ps" => Shell::PowerShell,
        "elvish" => Shell::Elvish,
        _ => {
            anyhow::bail!(
                "Unsupported shell: {}. Options: bash, zsh, fish, powershell, elvish",
                shell
            );
        }
    };

    let mut cmd = build_cli();
    generate(shell, &mut cmd, "deskhand", &mut std::io::stdout());

    eprintln!();
    eprintln!("# Usage:");
    match shell {
        Shell::Bash => {
            eprintln!("#   deskhand completions bash > ~/.local/share/bash-completion/completions/deskhand");
            eprintln!("#   or: eval \"$(deskhand completions bash)\"");
        }
        Shell::Zsh => {
            eprintln!("#   deskhand completions zsh > ~/.zfunc/_deskhand");
            eprintln!("#   Make sure fpath includes ~/.zfunc and run compinit");
        }
        Shell::Fish => {
            eprintln!("#   deskhand completions fish > ~/.config/fish/completions/deskhand.fish");
        }
        _ => {}
    }

    Ok(())
}

/// Build a minimal CLI definition for completion generation.
fn build_cli() -> clap::Command {
    clap::Command::new("deskhand")
        .about("Agent tool-belt for a sandboxed desktop workspace")
        .subcommand(clap::Command::new("onboard").about("Initialize configuration and workspace"))
        .subcommand(clap::Command::new("status").about("Show current configuration status"))
        .subcommand(clap::Command::new("doctor").about("Run environment diagnostics"))
        .subcommand(
            clap::Command::new("tools")
                .about("Manage tools")
                .subcommand(clap::Command::new("list").about("List all tools"))
                .subcommand(clap::Command::new("info").about("Show tool details"))
                .subcommand(clap::Command::new("call").about("Call a tool directly")),
        )
        .subcommand(
            clap::Command::new("sessions")
                .about("Manage command sessions")
                .subcommand(clap::Command::new("list").about("List live sessions"))
                .subcommand(clap::Command::new("kill").about("Kill a session")),
        )
        .subcommand(clap::Command::new("completions").about("Generate shell completions"))
}
