mod lobby;
mod observer;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use duet_core::{MemberId, TrackKind};
use duet_session::{
    LocalRelay, SessionConfig, SessionController, SessionHandle, SessionServices,
    SyntheticCapture, WebRtcPeerFactory,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::observer::ColoredObserver;

#[derive(Parser)]
#[command(name = "duet")]
#[command(bin_name = "duet")]
#[command(about = "Two-party calls negotiated over a messaging relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs a caller and a callee in this process and connects them.
    Call {
        /// Room to join. Prompted for when neither this nor the config names one.
        #[arg(short, long)]
        room: Option<String>,

        /// JSON session config.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// How long to stay in the call.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        /// Start the caller with its microphone muted.
        #[arg(long)]
        mute_audio: bool,

        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Call {
            room,
            config,
            seconds,
            mute_audio,
            verbose,
        } => {
            init_logging(verbose);

            let mut config = match config {
                Some(path) => SessionConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => SessionConfig::default(),
            };
            if let Some(room) = room {
                config.room = Some(room.into());
            }
            if config.room().is_err() {
                config.room = Some(lobby::prompt_room()?);
            }

            run_call(config, Duration::from_secs(seconds), mute_audio).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_call(config: SessionConfig, duration: Duration, mute_audio: bool) -> Result<()> {
    let relay = LocalRelay::new(config.app_id.clone());
    let room = config.room()?.clone();

    println!("{}", format!("🚀 Joining room {room}...").green().bold());

    let caller = start(&relay, config.clone(), "caller").await?;
    if mute_audio {
        caller.toggle_local_track(TrackKind::Audio)?;
        println!("{}", "🔇 Caller audio muted".yellow());
    }

    let mut callee_id = MemberId::generate();
    while &callee_id == caller.local_identity() {
        callee_id = MemberId::generate();
    }
    let callee = start(&relay, config.with_identity(callee_id), "callee").await?;

    info!(
        "Caller {} and callee {} are in {}",
        caller.local_identity(),
        callee.local_identity(),
        room
    );

    tokio::select! {
        _ = tokio::time::sleep(duration) => {
            println!("{}", "⏱  Call time is up".cyan());
        }
        _ = tokio::signal::ctrl_c() => {
            println!("{}", "⏹  Interrupted".cyan());
        }
    }

    let (left_caller, left_callee) = tokio::join!(caller.leave(), callee.leave());
    left_caller.context("Caller failed to leave")?;
    left_callee.context("Callee failed to leave")?;

    println!("{}", "✨ Call finished".green().bold());
    Ok(())
}

async fn start(relay: &LocalRelay, config: SessionConfig, label: &str) -> Result<SessionHandle> {
    let services = SessionServices {
        transport: Arc::new(relay.client()),
        capture: Arc::new(SyntheticCapture::new(format!("duet-{label}"))),
        peers: Arc::new(WebRtcPeerFactory::new(config.transport_config())),
        observer: Arc::new(ColoredObserver::new(label)),
    };
    SessionController::start(config, services)
        .await
        .with_context(|| format!("Failed to start the {label}"))
}
