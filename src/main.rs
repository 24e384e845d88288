// src/main.rs

use ballerina_update::commands::{self, Context};
use ballerina_update::version;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;

#[derive(Parser)]
#[command(name = "bal-update")]
#[command(author, version, about = "Manage Ballerina distributions: fetch, activate, update, and remove releases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a given distribution and set it as the active version
    Pull {
        /// Distribution version, or 'latest'
        version: String,
        /// Skip the update tool self-check
        #[arg(short, long, hide = true)]
        test: bool,
    },
    /// Update the active distribution to the latest patch of its series
    Update,
    /// Mark an installed distribution as the active distribution
    Use {
        /// Distribution version to activate
        version: String,
    },
    /// Remove a non-active distribution, or all of them
    Remove {
        /// Distribution version to remove
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        version: Option<String>,
        /// Remove all non-active distributions
        #[arg(short, long)]
        all: bool,
    },
    /// List distributions available locally and remotely
    List {
        /// Show every release instead of the most recent ones
        #[arg(short, long)]
        all: bool,
        /// Include pre-release channels
        #[arg(short, long)]
        pre_releases: bool,
    },
    /// Update the update tool itself to its latest version
    SelfUpdate,
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    // Diagnostics go through tracing; user-facing output stays on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("ballerina: {}", e);
        if e.is_usage() {
            eprintln!("Run 'bal-update help' for usage.");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> ballerina_update::Result<()> {
    match cli.command {
        Some(Commands::Pull { version, test }) => {
            info!("pulling distribution '{}'", version);
            commands::pull::run(&Context::discover()?, &version, test)
        }
        Some(Commands::Update) => commands::update::run(&Context::discover()?),
        Some(Commands::Use { version }) => {
            info!("activating distribution '{}'", version);
            commands::switch::run(&Context::discover()?, &version)
        }
        Some(Commands::Remove { version, all }) => {
            commands::remove::run(&Context::discover()?, version.as_deref(), all)
        }
        Some(Commands::List { all, pre_releases }) => {
            commands::list::run(&Context::discover()?, all, pre_releases)
        }
        Some(Commands::SelfUpdate) => commands::self_update::run(&Context::discover()?),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "bal-update", &mut std::io::stdout());
            Ok(())
        }
        None => {
            let ctx = Context::discover()?;
            println!("Ballerina Update Tool {}", ctx.tool_version());
            if let Some(active) = ctx.store().active_version()? {
                println!("Active distribution: {}", version::display_name(&active));
            }
            println!("Run 'bal-update help' for usage information");
            commands::print_update_notice(&ctx);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_remove_requires_version_or_all() {
        assert!(Cli::try_parse_from(["bal-update", "remove"]).is_err());
        assert!(Cli::try_parse_from(["bal-update", "remove", "1.2.3"]).is_ok());
        assert!(Cli::try_parse_from(["bal-update", "remove", "--all"]).is_ok());
        // specifying both is a conflict
        assert!(Cli::try_parse_from(["bal-update", "remove", "1.2.3", "--all"]).is_err());
    }

    #[test]
    fn test_pull_requires_a_version() {
        assert!(Cli::try_parse_from(["bal-update", "pull"]).is_err());
        assert!(Cli::try_parse_from(["bal-update", "pull", "latest"]).is_ok());
    }

    #[test]
    fn test_update_takes_no_arguments() {
        assert!(Cli::try_parse_from(["bal-update", "update", "extra"]).is_err());
        assert!(Cli::try_parse_from(["bal-update", "update"]).is_ok());
    }

    #[test]
    fn test_completions_shell_values() {
        assert!(Cli::try_parse_from(["bal-update", "completions", "bash"]).is_ok());
        assert!(Cli::try_parse_from(["bal-update", "completions", "zsh"]).is_ok());
        assert!(Cli::try_parse_from(["bal-update", "completions", "nushell"]).is_err());
    }
}
