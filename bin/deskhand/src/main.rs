mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "deskhand")]
#[command(about = "Agent tool-belt for a sandboxed desktop workspace", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize deskhand configuration and workspace
    Onboard {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration status
    Status,

    /// Run environment diagnostics
    Doctor,

    /// Manage registered tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },

    /// Manage command sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommands,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List all registered tools
    List,
    /// Show detailed info for a tool
    Info {
        /// Tool name
        name: String,
    },
    /// Call a tool directly with JSON params
    Call {
        /// Tool name
        name: String,
        /// JSON parameter object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
}

#[derive(Subcommand)]
enum SessionsCommands {
    /// List live command sessions
    List,
    /// Kill a command session
    Kill {
        /// Session name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Onboard { force } => {
            commands::onboard::run(force).await?;
        }
        Commands::Status => {
            commands::status::run().await?;
        }
        Commands::Doctor => {
            commands::doctor::run().await?;
        }
        Commands::Tools { command } => match command {
            ToolsCommands::List => {
                commands::tools_cmd::list().await?;
            }
            ToolsCommands::Info { name } => {
                commands::tools_cmd::info(&name).await?;
            }
            ToolsCommands::Call { name, params } => {
                commands::tools_cmd::call(&name, &params).await?;
            }
        },
        Commands::Sessions { command } => match command {
            SessionsCommands::List => {
                commands::sessions_cmd::list().await?;
            }
            SessionsCommands::Kill { name } => {
                commands::sessions_cmd::kill(&name).await?;
            }
        },
        Commands::Completions { shell } => {
            commands::completions_cmd::run(&shell).await?;
        }
    }

    Ok(())
}
