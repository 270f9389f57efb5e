//! Reframe CLI: render clips onto a portrait canvas from the command line.
//!
//! Usage:
//!   reframe render <SRC>     Composite and export a clip
//!   reframe compress <SRC>   Re-encode a clip under the byte budget
//!   reframe info <SRC>       Show probe results and the resolved layout
//!   reframe check            Check that ffmpeg and ffprobe are usable

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reframe_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "reframe",
    about = "Composite recorded clips onto a portrait canvas",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite a clip with an optional overlay and export it
    Render {
        /// Source video file
        source: PathBuf,

        /// Fit the clip onto the fixed canvas instead of its own portrait size
        #[arg(long)]
        landscape: bool,

        /// Overlay image (PNG) composited above the video
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// A color filter is applied to the clip
        #[arg(long)]
        filter: bool,

        /// Height of the on-screen preview player (defaults to the viewport height)
        #[arg(long)]
        preview_height: Option<f64>,

        /// Height of the preview viewport (defaults to the configured value)
        #[arg(long)]
        viewport_height: Option<f64>,

        /// Move the exported file here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-encode a clip without compositing
    Compress {
        /// Source video file
        source: PathBuf,

        /// Move the exported file here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show probe results and the layout a render would use
    Info {
        /// Source video file
        source: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the media tools are available
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    reframe_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Render {
            source,
            landscape,
            overlay,
            filter,
            preview_height,
            viewport_height,
            output,
        } => {
            commands::render::run(
                config,
                commands::render::RenderArgs {
                    source,
                    landscape,
                    overlay,
                    filter,
                    preview_height,
                    viewport_height,
                    output,
                },
            )
            .await
        }
        Commands::Compress { source, output } => {
            commands::compress::run(config, source, output).await
        }
        Commands::Info { source, json } => commands::info::run(&config, source, json),
        Commands::Check => commands::check::run(&config),
    }
}
