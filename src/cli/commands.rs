//! Command implementations

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{MenuItem, NodeView};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::render::TermTreeRenderer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Some(Commands::Completion { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    match &cli.command {
        Some(Commands::Tree {
            manifest,
            all,
            types,
        }) => cmd_tree(settings, manifest.as_deref(), *all, *types),
        Some(Commands::Menu { manifest, path }) => cmd_menu(settings, manifest.as_deref(), path),
        Some(Commands::Config { command }) => cmd_config(command, &settings, cli.config.as_deref()),
        Some(Commands::Completion { .. }) => Ok(()),
        None => Err(CliError::Usage("no command given, see --help".to_string())),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| InfraError::io("start async runtime", e).into())
}

fn resolve_manifest(arg: Option<&Path>, settings: &Settings) -> CliResult<PathBuf> {
    arg.map(Path::to_path_buf)
        .or_else(|| settings.manifest.clone())
        .ok_or_else(|| {
            CliError::Usage("no manifest: pass --manifest or set `manifest` in config".to_string())
        })
}

#[instrument(skip(settings))]
fn cmd_tree(settings: Settings, manifest: Option<&Path>, all: bool, types: bool) -> CliResult<()> {
    let manifest = resolve_manifest(manifest, &settings)?;
    debug!("manifest: {}", manifest.display());

    runtime()?.block_on(async {
        let container = ServiceContainer::from_manifest(settings, &manifest)?;
        let report = container.start().await?;
        for failure in &report.failed {
            output::warning(&format!("{}: {}", failure.name, failure.message));
        }

        let renderer = TermTreeRenderer::new()
            .show_collapsed(all)
            .with_types(types);
        let text = container.render(&renderer);
        if text.is_empty() {
            output::warning("no contributor provided root nodes");
        } else {
            output::info(text.trim_end());
        }
        container.shutdown();
        Ok::<_, CliError>(())
    })
}

#[instrument(skip(settings))]
fn cmd_menu(settings: Settings, manifest: Option<&Path>, path: &str) -> CliResult<()> {
    let manifest = resolve_manifest(manifest, &settings)?;
    let labels: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some((root_label, rest)) = labels.split_first() else {
        return Err(CliError::InvalidArgs(format!("empty node path: {:?}", path)));
    };

    runtime()?.block_on(async {
        let container = ServiceContainer::from_manifest(settings, &manifest)?;
        container.start().await?;

        let roots = container.engine.portfolio_trees();
        let key = roots
            .iter()
            .filter(|root| root.label == *root_label)
            .find_map(|root| root.find_by_labels(rest))
            .map(|node: &NodeView| node.key)
            .ok_or_else(|| CliError::InvalidArgs(format!("no node at {}", path)))?;

        match container.engine.context_menu_items(key, None) {
            Some(items) => {
                output::header(path);
                print_menu(&items, 1);
            }
            None => output::warning(&format!("no contributor offers a menu for {}", path)),
        }
        container.shutdown();
        Ok::<_, CliError>(())
    })
}

fn print_menu(items: &[MenuItem], depth: usize) {
    let indent = "  ".repeat(depth.saturating_sub(1));
    for item in items {
        if item.separator {
            output::detail_dimmed(&format!("{}---", indent));
        } else if item.disabled {
            output::detail_dimmed(&format!("{}{} (disabled)", indent, item.label));
        } else {
            output::detail(&format!("{}{}", indent, item.label));
        }
        print_menu(&item.items, depth + 1);
    }
}

fn cmd_config(
    command: &ConfigCommands,
    settings: &Settings,
    local: Option<&Path>,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", "unavailable"),
            }
            if let Some(path) = local {
                output::action("local", &path.display());
            }
        }
    }
    Ok(())
}
