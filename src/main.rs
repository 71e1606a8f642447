use std::sync::Arc;

use log::{error, info};

use flowvault::agent::AgentClient;
use flowvault::cache::LiveCache;
use flowvault::configuration::Config;
use flowvault::pipeline::{wait_for_signal, Flusher, Poller};
use flowvault::storage::{ArchiveStore, PrimaryStore};
use flowvault::web_interface::WebServer;

#[tokio::main]
async fn main() {
    // Example how to log
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let config = Config::from_args();
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let primary = match PrimaryStore::open(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            error!("Unable to open primary database: {}", e);
            std::process::exit(1);
        }
    };
    info!("Primary database ready at {}", config.database.display());

    let archive = match ArchiveStore::open(&config.archive_database).await {
        Ok(store) => store,
        Err(e) => {
            error!("Unable to open archive database: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Archive database ready at {}",
        config.archive_database.display()
    );

    let client = match AgentClient::new(
        config.api_url.clone(),
        config.api_token.clone(),
        config.fetch_timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to build the agent client: {}", e);
            std::process::exit(1);
        }
    };

    let cache = Arc::new(LiveCache::new());
    let poller = Poller::new(
        client,
        Arc::clone(&cache),
        config.suffix_list(),
        config.poll_period(),
    );
    let flusher = Flusher::new(Arc::clone(&cache), primary.clone(), config.flush_period());

    tokio::spawn(async move { poller.run().await });

    let flush_loop = flusher.clone();
    tokio::spawn(async move { flush_loop.run().await });

    let web = WebServer::new(primary, archive);
    let port = config.port;
    tokio::spawn(async move { web.start(port).await });

    info!(
        "flowvault started: polling every {} ms, flushing every {} min, web on port {}",
        config.poll_interval_ms, config.flush_interval, config.port
    );

    wait_for_signal().await;

    // Final synchronous flush so a graceful exit loses at most one poll
    // interval of cache state.
    info!("Shutdown signal received, flushing the live cache");
    flusher.flush_once().await;
    info!("Final flush done, exiting");
}
