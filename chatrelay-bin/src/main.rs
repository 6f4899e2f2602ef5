use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use chatrelay_core::{
    client::{RelayClient, driver::stream_completion, error_message},
    config::Config,
    model::{ChatMessage, CompletionRequest},
    relay::{self, RelayState},
};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Streaming chat-completion relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server
    Serve {
        /// Config file (JSON or TOML); the built-in NVIDIA setup when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the listen address
        #[arg(long)]
        bind: Option<String>,
    },
    /// Send a chat request through a running relay (prints deltas live)
    Chat {
        #[arg(long, default_value = "http://localhost:3000")]
        relay: String,
        #[arg(long)]
        model: String,
        #[arg(short, long, help = "Message from the user")]
        message: String,
        /// Ask for one buffered JSON response instead of a stream
        #[arg(long)]
        no_stream: bool,
    },
    /// List the models a relay offers
    Models {
        #[arg(long, default_value = "http://localhost:3000")]
        relay: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Serve { config, bind } => serve(config, bind).await,
        Commands::Chat {
            relay,
            model,
            message,
            no_stream,
        } => {
            let client = RelayClient::new(relay)?;
            let req = CompletionRequest::new(model, vec![ChatMessage::user(message)]);
            if no_stream {
                let body = client
                    .complete(&req)
                    .await
                    .map_err(|e| anyhow::anyhow!(error_message(&e)))?;
                match body["choices"][0]["message"]["content"].as_str() {
                    Some(text) => println!("{text}"),
                    None => println!("{}", serde_json::to_string_pretty(&body)?),
                }
                Ok(())
            } else {
                chat_stream(client, req).await
            }
        }
        Commands::Models { relay } => {
            let client = RelayClient::new(relay)?;
            let models = client
                .list_models()
                .await
                .map_err(|e| anyhow::anyhow!(error_message(&e)))?;
            for m in models {
                println!("{:<45} {} ({})", m.id, m.name, m.provider);
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn serve(config: Option<PathBuf>, bind: Option<String>) -> anyhow::Result<()> {
    let mut cfg = match &config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::builtin(),
    };
    if let Some(bind) = bind {
        cfg.server.bind = bind;
    }

    let state = RelayState::from_config(&cfg)?;
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            trigger.cancel();
        }
    });

    relay::serve(listener, state, shutdown).await?;
    Ok(())
}

async fn chat_stream(client: RelayClient, req: CompletionRequest) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = stream_completion(client, req, move |update| {
        let _ = tx.send(update);
    });

    let token = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, cancelling stream");
            token.cancel();
        }
    });

    let mut stdout = io::stdout();
    let mut failure = None;
    while let Some(update) = rx.recv().await {
        if update.done {
            failure = update.error;
            break;
        }
        print!("{}", update.fragment);
        stdout.flush().ok();
    }
    println!();
    handle.join().await;
    tracing::debug!(failed = failure.is_some(), "chat stream finished");

    match failure {
        Some(message) => anyhow::bail!(message),
        None => Ok(()),
    }
}
