//! CLI for folderpost
//!
//! Subcommands:
//! - `server`: run the HTTP server
//! - `get`: print the records of a folder
//! - `put`: post a message to a folder

use clap::Parser;
use folderpost::broker::Broker;
use folderpost::client::FolderClient;
use folderpost::config::load_config;
use folderpost::transport::start_http_server;
use folderpost::utils::logging;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_URL: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "folderpost")]
enum Command {
    /// Start the HTTP server
    Server,
    /// Fetch messages from a folder
    Get {
        #[arg(long)]
        folder: String,
        /// Only messages posted at or after this unix timestamp
        #[arg(long)]
        since: Option<i64>,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
    /// Post a message to a folder
    Put {
        #[arg(long)]
        folder: String,
        #[arg(long)]
        msg: String,
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                logging::init("info");
                error!("Server failed: {}", e);
            }
        }
        Command::Get { folder, since, url } => {
            logging::init("warn");
            if let Err(e) = run_get(&url, &folder, since).await {
                error!("Get failed: {}", e);
            }
        }
        Command::Put { folder, msg, url } => {
            logging::init("warn");
            if let Err(e) = run_put(&url, &folder, &msg).await {
                error!("Put failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(&config.log.level);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let broker = Arc::new(Broker::from_settings(&config.store));
    info!(
        data_dir = %config.store.data_dir,
        retention_secs = config.store.retention_secs,
        compaction = ?config.store.compaction,
        "starting folderpost"
    );

    tokio::select! {
        result = start_http_server(&addr, broker) => {
            result?;
            error!("HTTP server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_get(url: &str, folder: &str, since: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let client = FolderClient::new(url);
    for record in client.fetch(folder, since).await? {
        println!("{record}");
    }
    Ok(())
}

async fn run_put(url: &str, folder: &str, msg: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = FolderClient::new(url);
    let timestamp = client.post(folder, msg).await?;
    println!("{timestamp}");
    Ok(())
}
