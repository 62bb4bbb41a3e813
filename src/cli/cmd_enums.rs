use clap::{Parser, Subcommand};

/// Defines the command-line interface (CLI) for `devbox-update`.
#[derive(Parser, Debug)]
#[command(name = "devbox-update")]
#[command(about = "Detect, reconcile and update editor extensions and CLI packages", long_about = None)]
pub struct Cli {
    /// Enables detailed debug output for troubleshooting.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to the configuration file (defaults to ~/.devbox-update/config.yaml).
    #[arg(long, global = true, env = "DEVBOX_UPDATE_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Detects every install surface and shows installed vs. latest versions. Changes nothing.
    Check,
    /// Updates the selected targets and profiles to the latest version.
    Update {
        /// Resolve and plan, but do not download, install or verify anything.
        #[arg(long)]
        dry_run: bool,
        /// Select every outdated target without prompting.
        #[arg(long)]
        all_targets: bool,
        /// Select every outdated profile without prompting.
        #[arg(long)]
        all_profiles: bool,
        /// Reinstall even where the latest version is already present.
        #[arg(long)]
        force: bool,
        /// Never prompt; implies --all-targets and --all-profiles.
        #[arg(short, long)]
        yes: bool,
    },
    /// Writes a default configuration file to --config (or the default location).
    Generate {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Show the current version of the tool.
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_flags_parse() {
        let cli = Cli::parse_from(["devbox-update", "--debug", "update", "--dry-run", "--all-profiles", "-y"]);

        assert!(cli.debug);
        assert_eq!(
            cli.command,
            Commands::Update {
                dry_run: true,
                all_targets: false,
                all_profiles: true,
                force: false,
                yes: true,
            }
        );
    }

    #[test]
    fn global_config_is_accepted_after_subcommand() {
        let cli = Cli::parse_from(["devbox-update", "check", "--config", "/tmp/c.yaml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.yaml"));
        assert_eq!(cli.command, Commands::Check);
    }

    #[test]
    fn generate_writes_to_global_config_path() {
        let cli = Cli::parse_from(["devbox-update", "generate", "--config", "/tmp/c.yaml", "--force"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/c.yaml"));
        assert_eq!(cli.command, Commands::Generate { force: true });
    }
}
