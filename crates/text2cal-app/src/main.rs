//! text2cal: screenshot region → OCR → calendar event.
//!
//! Runs the coordinator, page and sandbox contexts in one process, wired
//! together by channels, and drives them from the command line.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use text2cal_config::Config;
use text2cal_types::{OcrProviderId, ParserId};
use tracing_subscriber::EnvFilter;

mod commands;
mod controller;
mod coordinator;
mod page;
mod sandbox_bridge;


use commands::Selection;

#[derive(Parser)]
#[command(
    name = "text2cal",
    version,
    about = "Turn a screenshot region into a calendar event",
    after_help = "EXAMPLES:\n  \
                  text2cal capture frame.png --rect 120,80,300,40\n  \
                  text2cal capture frame.png --rect 60,40,150,20 --scale 2\n  \
                  text2cal diag ocr --provider google-vision snippet.png\n  \
                  text2cal diag parse --provider openai \"Lunch Fri 12:30 at Joe's\""
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select a region of a saved screenshot and run the full pipeline
    Capture(CaptureArgs),

    /// Run a single provider directly
    #[command(subcommand)]
    Diag(DiagCommand),
}

#[derive(Args)]
struct CaptureArgs {
    /// Full-frame screenshot standing in for the visible page
    screenshot: PathBuf,

    /// Drag in logical pixels: x,y,width,height
    #[arg(long, value_parser = commands::parse_selection)]
    rect: Selection,

    /// Physical pixels per logical pixel of the captured display
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
}

#[derive(Subcommand)]
enum DiagCommand {
    /// Run OCR on an image file or URL
    Ocr {
        #[arg(long, default_value = "local")]
        provider: OcrProviderId,

        /// PNG path, or an http(s) URL for providers that accept one
        image: String,
    },

    /// Parse event text
    Parse {
        #[arg(long, default_value = "local")]
        provider: ParserId,

        text: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if atty::is(atty::Stream::Stderr) {
        builder.init();
    } else {
        builder.json().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::new();

    match cli.command {
        Commands::Capture(args) => {
            commands::capture(config, args.screenshot, args.rect, args.scale).await
        }
        Commands::Diag(DiagCommand::Ocr { provider, image }) => {
            commands::diag_ocr(config, provider, image).await
        }
        Commands::Diag(DiagCommand::Parse { provider, text }) => {
            commands::diag_parse(config, provider, text).await
        }
    }
}
