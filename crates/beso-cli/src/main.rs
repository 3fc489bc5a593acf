use anyhow::Result;
use beso_vision::FilterKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod chat;
mod config;
mod vision;

use config::Config;
use vision::{CameraOptions, DetectArgs, DetectOptions};

#[derive(Parser)]
#[command(name = "beso", about = "Beso chat assistant and face detection tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (log in with /login)
    Chat,
    /// Create an account
    Register { username: String, password: String },
    /// Show the stored password for an account
    Recover { username: String },
    /// Ask the bot a single question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Detect faces in an image
    Detect {
        image: PathBuf,
        #[command(flatten)]
        params: DetectArgs,
        /// Filter applied after detection (grayscale, sepia)
        #[arg(long, value_parser = clap::value_parser!(FilterKind))]
        filter: Option<FilterKind>,
        /// Where to save the annotated image
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to save the detection statistics
        #[arg(long)]
        stats: Option<PathBuf>,
    },
    /// Live face detection from a camera
    Camera {
        /// V4L2 device path (default from BESO_CAMERA_DEVICE)
        #[arg(short, long)]
        device: Option<String>,
        #[command(flatten)]
        params: DetectArgs,
        /// Stop after this many frames
        #[arg(long)]
        frames: Option<u64>,
        /// Record annotated frames into this directory
        #[arg(long)]
        record: Option<PathBuf>,
        /// Save the last annotated frame on exit
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Save detection statistics on exit
        #[arg(long)]
        stats: Option<PathBuf>,
    },
    /// List video capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Chat => chat::run_repl(&config).await?,
        Commands::Register { username, password } => chat::register(&config, &username, &password)?,
        Commands::Recover { username } => chat::recover(&config, &username)?,
        Commands::Ask { question } => chat::ask(&config, &question.join(" ")).await?,
        Commands::Detect {
            image,
            params,
            filter,
            output,
            stats,
        } => vision::detect(
            &config,
            DetectOptions {
                image: &image,
                args: &params,
                filter,
                output: output.as_deref(),
                stats: stats.as_deref(),
            },
        )?,
        Commands::Camera {
            device,
            params,
            frames,
            record,
            snapshot,
            stats,
        } => {
            vision::camera(
                &config,
                CameraOptions {
                    device: device.as_deref(),
                    args: &params,
                    frames,
                    record,
                    snapshot: snapshot.as_deref(),
                    stats: stats.as_deref(),
                },
            )
            .await?
        }
        Commands::Devices => vision::devices()?,
    }

    Ok(())
}
