//! Lectern CLI: inspect lectures, resolve captions, and compile lecture videos.
//!
//! Usage:
//!   lectern compile <LECTURE>    Compile a lecture into a downloadable video
//!   lectern captions <LECTURE>   Resolve (and optionally export) captions
//!   lectern info <LECTURE>       Show lecture information
//!   lectern check                Check system capabilities

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lectern_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "lectern",
    about = "Avatar-led lecture player and video compiler",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL that relative asset paths resolve against
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory that local asset paths resolve against
    #[arg(long, global = true)]
    assets_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a lecture into a downloadable video
    Compile {
        /// Path to the lecture JSON file
        lecture: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Target FPS (defaults to the configured player FPS)
        #[arg(long)]
        fps: Option<u32>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,
    },

    /// Resolve the lecture transcript
    Captions {
        /// Path to the lecture JSON file
        lecture: PathBuf,

        /// Write the resolved cues to this file (.srt or .vtt)
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Show lecture information
    Info {
        /// Path to the lecture JSON file
        lecture: PathBuf,

        /// Probe the narration media with ffprobe
        #[arg(long)]
        probe: bool,

        /// Print the lecture as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system capabilities
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(base_url) = cli.base_url {
        config.assets.base_url = Some(base_url);
    }
    if let Some(root) = cli.assets_root {
        config.assets.root = Some(root);
    }
    lectern_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Compile {
            lecture,
            output,
            fps,
            width,
            height,
        } => {
            if let Some(fps) = fps {
                config.player.fps = fps;
            }
            if let Some(width) = width {
                config.player.width = width;
            }
            if let Some(height) = height {
                config.player.height = height;
            }
            commands::compile::run(lecture, output, &config).await
        }
        Commands::Captions { lecture, export } => {
            commands::captions::run(lecture, export, &config).await
        }
        Commands::Info {
            lecture,
            probe,
            json,
        } => commands::info::run(lecture, probe, json, &config),
        Commands::Check => commands::check::run(),
    }
}
