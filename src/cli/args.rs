//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Pluggable navigation tree composition: ordered contributors, async fan-in, first-match event dispatch
#[derive(Parser, Debug)]
#[command(name = "navcompose")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug level: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Config file layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose and print the navigation tree
    Tree {
        /// Contributor manifest (default: `manifest` from config)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        manifest: Option<PathBuf>,
        /// Show children of collapsed nodes
        #[arg(short, long)]
        all: bool,
        /// Show node types
        #[arg(short, long)]
        types: bool,
    },

    /// Print the context menu of a node
    Menu {
        /// Contributor manifest (default: `manifest` from config)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        manifest: Option<PathBuf>,
        /// Label path from a root, e.g. `Watchlists/Tech`
        #[arg(short, long)]
        path: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_repeated_debug_flag_when_parsing_then_counted() {
        let cli = Cli::parse_from(["navcompose", "-dd", "tree", "--all"]);
        assert_eq!(cli.debug, 2);
        assert!(matches!(
            cli.command,
            Some(Commands::Tree { all: true, types: false, .. })
        ));
    }
}
