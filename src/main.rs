use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ghsearch::api::create_router;
use ghsearch::config::CONFIG;
use ghsearch::{ClientConfig, GithubClient, SearchManager};

/// Scrape site search results for keywords through rotating proxies.
#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one search and print the records as JSON.
    Search {
        /// Request payload, e.g. '{"keywords": ["rust"], "proxies": ["1.2.3.4:8080"], "type": "Repositories"}'.
        /// Read from stdin when omitted.
        #[clap(short, long)]
        json_payload: Option<String>,
    },
    /// Serve the search over HTTP.
    Serve {
        /// Listen address, defaults to SCRAPER_BIND_ADDR.
        #[clap(short, long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = CONFIG
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let manager = SearchManager::new(GithubClient::new(ClientConfig::from_env()));

    match args.command {
        Command::Search { json_payload } => {
            let payload = match json_payload {
                Some(payload) => payload,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("failed to read payload from stdin")?;
                    buf
                }
            };
            let results = manager.run(&payload).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!("listening on {addr}");
            axum::serve(listener, create_router(Arc::new(manager)))
                .await
                .context("server error")?;
        }
    }
    Ok(())
}
