use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coedit_client::{join_room, ParticipantHandle, Phase, RoomDirectory, SessionView};
use coedit_common::CoeditError;
use coedit_config::ClientConfig;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "coedit", about = "Line-mode participant for a coedit room")]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Relay base URL, overriding `client.server_url`.
    #[arg(short, long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a room and join it.
    Create {
        /// Reserve this id instead of letting the relay mint one.
        #[arg(long)]
        custom_id: Option<String>,
    },
    /// Join an existing room.
    Join { room_id: String },
}

const HELP: &str = "lines are appended to the document; \
    :apply :dismiss :show :clear :quit";

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match coedit_config::read_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coedit: {e}");
            std::process::exit(2);
        }
    };
    if let Some(server) = args.server {
        config.client.server_url = server;
    }
    if let Err(e) = coedit_config::validate_client(&config.client) {
        eprintln!("coedit: {e}");
        std::process::exit(2);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .filter_for(&["coedit_client", "coedit_config"])
                    .into()
            }),
        )
        .init();

    if let Err(e) = run(&config.client, args.command).await {
        eprintln!("coedit: {e}");
        std::process::exit(1);
    }
}

async fn run(config: &ClientConfig, command: Command) -> Result<(), CoeditError> {
    let room_id = match command {
        Command::Create { custom_id } => {
            let directory = RoomDirectory::new(config)?;
            let room_id = directory.create_room(custom_id.as_deref()).await?;
            println!("created room {room_id}");
            room_id
        }
        Command::Join { room_id } => room_id,
    };

    let participant = join_room(config, &room_id).await?;
    println!("joined room {room_id} ({HELP})");

    let printer = tokio::spawn(print_changes(participant.subscribe()));
    read_input(&participant).await?;

    participant.close().await;
    printer.abort();
    Ok(())
}

async fn read_input(participant: &ParticipantHandle) -> Result<(), CoeditError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let open = match line.trim() {
            ":quit" => break,
            ":apply" => participant.apply().await,
            ":dismiss" => participant.dismiss().await,
            ":clear" => participant.edit(String::new()).await,
            ":show" => {
                render(&participant.view());
                true
            }
            _ => participant.append_line(line.clone()).await,
        };
        if !open {
            break;
        }
    }
    Ok(())
}

/// Redraw whenever the document or suggestion changes.
async fn print_changes(mut view: tokio::sync::watch::Receiver<SessionView>) {
    let mut last = view.borrow_and_update().clone();
    while view.changed().await.is_ok() {
        let next = view.borrow_and_update().clone();
        if next.document != last.document || next.suggestion != last.suggestion {
            render(&next);
        } else if last.connected && !next.connected {
            println!("-- disconnected from room {} --", next.room_id);
        }
        last = next;
    }
}

fn render(view: &SessionView) {
    println!("----- {} -----", view.room_id);
    println!("{}", view.document);
    match (&view.suggestion, view.phase) {
        (Some(suggestion), _) => println!("~~ suggestion (:apply / :dismiss) ~~\n{suggestion}"),
        (None, Phase::PendingSuggestion) => println!("~~ thinking ~~"),
        _ => {}
    }
    if !view.connected {
        println!("-- offline --");
    }
}
