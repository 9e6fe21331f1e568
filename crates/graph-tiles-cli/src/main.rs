//! graph-tiles CLI - lay out graphs and render them into zoomable tile pyramids.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graph_tiles_ops::Config;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;
mod input;

use commands::{config as config_cmd, generate, layout};
use input::InputArgs;

/// graph-tiles CLI - force-directed layout and tile pyramid generation.
#[derive(Parser, Debug)]
#[command(
    name = "gt",
    author,
    version,
    about = "graph-tiles: lay out graphs and cut them into map tiles",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the user config.
    #[arg(long, global = true, env = "GT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out a graph and write its tile pyramid.
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory (tiles go to OUTPUT/tiles/{z}/{col}-{row}.png).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of zoom levels.
        #[arg(short, long)]
        zoom_levels: Option<u32>,

        /// Tile edge length in pixels.
        #[arg(long)]
        tile_size: Option<u32>,

        /// Maximum simulation ticks.
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Quiescence timeout in seconds.
        #[arg(long)]
        timeout: Option<f64>,

        /// Remove the output directory before writing.
        #[arg(long)]
        clean: bool,
    },

    /// Run only the simulation and write node positions as JSON.
    Layout {
        #[command(flatten)]
        input: InputArgs,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum simulation ticks.
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Quiescence timeout in seconds.
        #[arg(long)]
        timeout: Option<f64>,
    },

    /// Manage configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration.
    Show,

    /// Show path to config file.
    Path,

    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    match cli.command {
        Commands::Generate {
            input,
            output,
            zoom_levels,
            tile_size,
            max_ticks,
            timeout,
            clean,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = generate::GenerateOptions {
                output,
                zoom_levels,
                tile_size,
                max_ticks,
                timeout,
                clean,
            };
            generate::execute(config, input.load()?, &options, !cli.quiet).await?;
        }

        Commands::Layout {
            input,
            output,
            max_ticks,
            timeout,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let options = layout::LayoutOptions {
                output,
                max_ticks,
                timeout,
            };
            layout::execute(config, input.load()?, &options)?;
        }

        Commands::Config(config_cmd_inner) => {
            let path = cli.config.clone().or_else(Config::config_file_path);
            match config_cmd_inner {
                ConfigCommands::Show => {
                    let config = load_config(cli.config.as_deref())?;
                    config_cmd::show(&config, path.as_deref())?;
                }
                ConfigCommands::Path => {
                    config_cmd::path(path.as_deref())?;
                }
                ConfigCommands::Init { force } => {
                    config_cmd::init(path, force)?;
                }
            }
        }
    }

    Ok(())
}

/// Load the explicit config file if given, else the user config, with
/// `GT_*` environment overrides applied either way.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .with_overrides(|key| std::env::var(key).ok())?),
        None => Config::load().context("Failed to load config"),
    }
}
