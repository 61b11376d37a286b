//! revqd entry point: the CDC ingestion worker.
//!
//! Boots the change-stream consumer that keeps the search replica in
//! sync with the primary store's change feed. Query serving is a library
//! concern (`revq_core::QueryEngine`); this process only ingests.
//! Logging goes to stderr as JSON.

use anyhow::Result;
use revq_client::{ChangeLogConfig, RedisChangeLog, SearchClient, SearchConfig};
use revq_core::{AppConfig, Consumer, IndexWriter};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    tracing::info!(
        stream = %config.change_stream,
        group = %config.change_group,
        index = %config.search_index,
        "starting revqd"
    );

    let search = Arc::new(SearchClient::new(SearchConfig {
        base_url: config.search_url.clone(),
        index: config.search_index.clone(),
        timeout: config.search_timeout(),
    })?);

    let log = RedisChangeLog::connect(&ChangeLogConfig {
        url: config.redis_url.clone(),
        stream: config.change_stream.clone(),
        group: config.change_group.clone(),
        consumer: config.change_consumer.clone(),
        block_ms: config.change_block_ms,
    })
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = Consumer::new(log, IndexWriter::new(search), shutdown_rx);
    let mut worker = tokio::spawn(consumer.run());

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
        outcome = &mut worker => {
            // The consumer only exits on its own when the log fails.
            outcome??;
            return Ok(());
        }
    }

    worker.await??;
    tracing::info!("revqd stopped");
    Ok(())
}
