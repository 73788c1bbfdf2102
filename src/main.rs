use std::{path::Path, sync::Arc};

use anyhow::{Error, Result};
use notification_service::{
    api::{AppState, run_api_server},
    channels::ChannelRegistry,
    clients::{rbmq::RabbitMqClient, redis::RedisStatusStore},
    config::Config,
    logging::init_logging,
    queue::{InMemoryQueue, NotificationQueue},
    services::{dispatcher::Dispatcher, worker::run_worker},
    store::{InMemoryStatusStore, StatusStore},
};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::load()?;

    let _log_guards = init_logging(Path::new(&config.log_dir))?;

    info!("Configuration validated");

    let store: Arc<dyn StatusStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisStatusStore::connect(url, &config.retry_config()).await?),
        None => {
            warn!("REDIS_URL not set, status records will not survive a restart");
            Arc::new(InMemoryStatusStore::new())
        }
    };

    let queue: Arc<dyn NotificationQueue> = match &config.rabbitmq_url {
        Some(_) => Arc::new(RabbitMqClient::connect(&config).await?),
        None => {
            warn!("RABBITMQ_URL not set, using in-process queue");
            Arc::new(InMemoryQueue::new())
        }
    };

    let registry = Arc::new(ChannelRegistry::default());
    info!(channels = ?registry.channel_names(), "Channel adapters registered");

    let dispatcher = Arc::new(Dispatcher::new(store.clone(), registry));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let workers: Vec<_> = (0..config.worker_concurrency)
        .map(|worker_id| {
            tokio::spawn(run_worker(
                worker_id,
                queue.clone(),
                dispatcher.clone(),
                shutdown_rx.clone(),
            ))
        })
        .collect();

    let state = Arc::new(AppState::new(store, queue, config.publish_timeout()));

    let server_result = run_api_server(&config, state, shutdown_signal()).await;

    info!("Shutting down workers");
    let _ = shutdown_tx.send(true);

    for worker in workers {
        if let Err(e) = worker.await {
            error!(error = %e, "Worker task failed");
        }
    }

    server_result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
