//! voice-agent-rs: memory and speech-preparation service for a voice agent.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voice_agent_rs::api::{self, AppState};
use voice_agent_rs::config::Config;
use voice_agent_rs::memory::{report, MemoryStore};
use voice_agent_rs::speech::SpeechOptimizer;

#[derive(Parser, Debug)]
#[command(name = "voice-agent-rs", about = "Voice agent memory and speech service")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override memory.data_dir
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Optimize text for speech and print the result
    Optimize {
        text: String,
    },
    /// Print a customer's recent turns as JSON
    History {
        customer_id: String,
        #[arg(short = 'n', long)]
        last: Option<usize>,
    },
    /// Print a customer's summarized context as JSON
    Summary {
        customer_id: String,
        #[arg(short = 'n', long)]
        last: Option<usize>,
    },
    /// Print memory statistics as JSON
    Stats,
    /// Print a Markdown conversation report
    Report {
        customer_id: String,
    },
    /// Write demo customers if the store is empty
    Seed,
    /// Delete a customer's conversation log
    Clear {
        customer_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.verbose {
            EnvFilter::new("debug,hyper=info,tower_http=debug")
        } else {
            EnvFilter::new("info,hyper=warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(args.config.as_deref());
    if let Some(dir) = args.data_dir {
        config.memory.data_dir = dir;
    }
    info!("Data directory: {}", config.memory.data_dir.display());

    let store = Arc::new(MemoryStore::new(config.memory.clone()));
    let optimizer = Arc::new(SpeechOptimizer::new(config.speech.clone()));
    let window = config.memory.default_window;

    match args.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            store.init().await?;
            if config.memory.seed_sample_data {
                store.seed_sample_data().await?;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            api::serve(AppState { store, optimizer }, &config.server).await?;
        }
        Command::Optimize { text } => {
            println!("{}", optimizer.prepare_for_tts(&text)?);
        }
        Command::History { customer_id, last } => {
            let history = store
                .conversation_history(&customer_id, last.unwrap_or(window))
                .await;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Summary { customer_id, last } => {
            let summary = store
                .summarized_context(&customer_id, last.unwrap_or(window))
                .await;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Stats => {
            let stats = store.memory_stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Report { customer_id } => {
            println!("{}", report::generate_report(&store, &customer_id).await);
        }
        Command::Seed => {
            if store.seed_sample_data().await? {
                info!("Sample data written");
            } else {
                info!("Store already has customers, nothing seeded");
            }
        }
        Command::Clear { customer_id } => {
            if !store.clear_history(&customer_id).await {
                return Err(format!("failed to clear history for {customer_id}").into());
            }
        }
    }

    Ok(())
}
