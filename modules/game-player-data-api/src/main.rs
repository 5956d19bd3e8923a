use std::sync::Arc;

use anyhow::{Context, Result};
use game_player_data_api::{build_router, AppState};
use game_player_data_common::Config;
use game_player_data_ingest::{feed, Ingestor, PgUpdateFeed};
use game_player_data_store::{PgPlayerStore, PlayerDataStore};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("game_player_data=info".parse()?),
        )
        .init();

    info!("Game player data service starting...");

    let config = Config::from_env();
    config.log_redacted();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    let store = PgPlayerStore::new(pool.clone()).with_timeout(config.store_timeout);
    store.migrate().await?;
    feed::migrate(&pool).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Ingestion
    let updates = PgUpdateFeed::new(pool.clone(), config.feed_consumer.clone())
        .with_poll_interval(config.feed_poll_interval)
        .with_batch_size(config.feed_batch_size)
        .with_timeout(config.store_timeout);
    let ingestor = Ingestor::new(store.clone(), config.defaults);
    let ingest_rx = shutdown_rx.clone();
    let ingest_task = tokio::spawn(async move { ingestor.run(updates, ingest_rx).await });

    // Queries
    let shared: Arc<dyn PlayerDataStore> = Arc::new(store);
    let app = build_router(Arc::new(AppState::new(shared)));

    let addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Game player data API listening on {addr}");

    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(stop_requested(shutdown_rx))
            .await
    });

    let early_exit = tokio::select! {
        signal = shutdown_signal() => {
            info!(signal, "Shutdown signal received");
            None
        }
        result = &mut server => {
            warn!("HTTP server exited before a shutdown signal");
            Some(result)
        }
    };

    // Stop intake first, then let the in-flight event finish.
    let _ = shutdown_tx.send(true);

    let served = match early_exit {
        Some(result) => result,
        None => server.await,
    };

    match ingest_task.await {
        Ok(stats) => info!(%stats, "Ingestion drained"),
        Err(e) => error!(error = %e, "Ingest task panicked"),
    }

    pool.close().await;
    info!("Shutdown complete");

    served?.context("HTTP server failed")?;
    Ok(())
}

async fn stop_requested(mut shutdown: watch::Receiver<bool>) {
    loop {
        let stop = *shutdown.borrow();
        if stop || shutdown.changed().await.is_err() {
            break;
        }
    }
}

/// Resolves on SIGINT or SIGTERM with the signal's name.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(e) => {
                warn!(error = %e, "No SIGTERM handler, waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "SIGINT"
    }
}
