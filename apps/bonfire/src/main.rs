use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncBufReadExt;

use bonfire::config::Config;
use bonfire::model::LogStore;
use bonfire::render::StdoutRenderer;
use bonfire::session::{ChatSession, SessionState};
use bonfire::telemetry;
use bonfire::transport::HttpTransport;

#[derive(Parser, Debug)]
#[command(name = "bonfire")]
struct Cli {
    /// Base URL of the chat server
    #[arg(long, env = "BONFIRE_SERVER")]
    server: Option<String>,

    /// Milliseconds between sync ticks
    #[arg(long, env = "BONFIRE_POLL_MS")]
    poll_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init()?;
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.poll_interval = Duration::from_millis(poll_ms);
    }

    let log = Arc::new(LogStore::with_sink(Box::new(StdoutRenderer)));
    let transport =
        Arc::new(HttpTransport::new(&config).context("failed to build the chat transport")?);
    let session = ChatSession::start(transport, log, &config);

    println!(
        "connected to {} (type a message, /quit to leave)",
        config.server_url
    );

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }
        if session.send_message(text).await.is_err() {
            break;
        }
        if session.state() == SessionState::Closed {
            break;
        }
    }

    if session.state() == SessionState::Active {
        session.disconnect().await;
    }
    Ok(())
}
