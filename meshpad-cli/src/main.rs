use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Input;
use meshpad::client::{MeshEvent, Session, SessionConfig, SessionHandle, YrsDocument};
use meshpad::model::IceServerConfig;
use meshpad::server::{RelayConfig, serve};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshpad")]
#[command(about = "Peer-to-peer shared notepad over WebRTC")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        /// Address to listen on. Falls back to 0.0.0.0:$PORT, then 0.0.0.0:5000.
        #[arg(long, env = "MESHPAD_BIND")]
        bind: Option<SocketAddr>,
    },
    /// Join a room and edit its document from the terminal.
    Join {
        /// Room to join; prompted for when omitted.
        room: Option<String>,

        #[arg(long, env = "MESHPAD_SERVER", default_value = "ws://127.0.0.1:5000")]
        server: String,

        /// STUN/TURN url; repeat for several. Defaults to a public STUN server.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        #[arg(long, default_value_t = 1000)]
        reconnect_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { bind } => run_relay(bind).await,
        Commands::Join {
            room,
            server,
            ice_servers,
            reconnect_ms,
        } => {
            let mut config = SessionConfig::new(server)
                .with_reconnect_delay(Duration::from_millis(reconnect_ms));
            if !ice_servers.is_empty() {
                config = config.with_ice_servers(
                    ice_servers.into_iter().map(IceServerConfig::stun).collect(),
                );
            }
            run_peer(room, config).await
        }
    }
}

async fn run_relay(bind: Option<SocketAddr>) -> Result<()> {
    let mut config = RelayConfig::default();
    if let Some(addr) = bind {
        config = config.with_bind_addr(addr);
    } else if let Ok(port) = std::env::var("PORT") {
        let port: u16 = port.parse().context("PORT is not a valid port number")?;
        config = config.with_bind_addr(SocketAddr::from(([0, 0, 0, 0], port)));
    }

    println!(
        "{} {}",
        "📡 Relay listening on".green().bold(),
        config.bind_addr
    );
    serve(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_peer(room: Option<String>, config: SessionConfig) -> Result<()> {
    let room = match room {
        Some(room) => room,
        None => Input::<String>::new()
            .with_prompt("Room")
            .interact_text()
            .context("Failed to read room name")?,
    };

    let doc = Arc::new(YrsDocument::new());
    let mut handle = Session::join(config, room, doc.clone())?;
    let mut events = handle
        .take_events()
        .context("Session event stream already taken")?;

    println!(
        "{} {} {} {}",
        "🔗 Joining room".cyan(),
        handle.room().to_string().bold(),
        "as".cyan(),
        handle.peer_id().to_string().bold()
    );
    println!("{}", "Type a line to append it, /quit to leave.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim() == "/quit" => break,
                Some(line) => doc.push(&format!("{}\n", line)),
                None => break,
            },
            event = events.recv() => match event {
                Some(event) => print_event(&event, &doc),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    leave(handle).await;
    Ok(())
}

fn print_event(event: &MeshEvent, doc: &YrsDocument) {
    match event {
        MeshEvent::PresenceChanged(count) => {
            println!("{} {}", "👥 Active users:".blue(), count)
        }
        MeshEvent::PeerConnected(peer) => println!("{} {}", "✅ Connected to".green(), peer),
        MeshEvent::PeerLost(peer) => println!("{} {}", "⚠️  Lost".yellow(), peer),
        MeshEvent::StateChanged(state) => println!("{} {}", "• Session".dimmed(), state),
        MeshEvent::DocumentChanged { from } => {
            println!("{} {}", "📝 Update from".magenta(), from);
            println!("{}", doc.text());
        }
    }
}

async fn leave(handle: SessionHandle) {
    handle.leave().await;
    println!("{}", "👋 Left the room".green().bold());
}
