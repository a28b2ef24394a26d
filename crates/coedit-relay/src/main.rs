use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use coedit_relay::{serve, spawn_reaper, AppState};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "coedit-relay", about = "Room relay and completion service for coedit")]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `relay.bind`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Seconds an empty room is kept, overriding `relay.room_ttl_secs`.
    #[arg(long)]
    room_ttl: Option<u64>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match coedit_config::read_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coedit-relay: {e}");
            std::process::exit(2);
        }
    };
    if let Some(bind) = args.bind {
        config.relay.bind = bind;
    }
    if let Some(ttl) = args.room_ttl {
        config.relay.room_ttl_secs = ttl;
    }
    if let Err(e) = coedit_config::validate_relay(&config.relay) {
        eprintln!("coedit-relay: {e}");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .filter_for(&["coedit_relay", "coedit_config"])
                    .into()
            }),
        )
        .init();

    let state = match AppState::from_config(&config.relay) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up completion engine");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(&config.relay.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.relay.bind, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!("coedit-relay listening on {}", config.relay.bind);

    spawn_reaper(
        state.rooms.clone(),
        Duration::from_secs(config.relay.reap_interval_secs),
    );

    if let Err(e) = serve(listener, state).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
