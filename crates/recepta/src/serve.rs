// SPDX-FileCopyrightText: 2026 Recepta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recepta serve` wiring.
//!
//! Assembles the full pipeline: credential store, SQLite conversation
//! store, connection manager, outbound queue, and inbound ingester. The
//! transport session library, reply generator, and status channel are
//! external collaborators supplied by the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use recepta_agent::shutdown;
use recepta_agent::{
    ConnectionManager, DeliveryPolicy, InboundIngester, OutboundQueue, ReconnectPolicy,
};
use recepta_config::model::ReceptaConfig;
use recepta_core::traits::{ConversationStore, ReplyGenerator, StatusSink, Transport};
use recepta_core::ReceptaError;
use recepta_keystore::CredentialStore;
use recepta_storage::SqliteStore;

/// How long shutdown waits for pending outbound messages before abandoning them.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the agent until the cancellation token fires.
///
/// Connects the transport, then serves inbound and outbound traffic until
/// shutdown is requested. On shutdown the outbound queue is drained within
/// a bounded window, the session is logged out, and the database is
/// checkpointed.
pub async fn run(
    config: ReceptaConfig,
    transport: Arc<dyn Transport>,
    replier: Arc<dyn ReplyGenerator>,
    status_sink: Arc<dyn StatusSink>,
    cancel: CancellationToken,
) -> Result<(), ReceptaError> {
    info!(agent = config.agent.name.as_str(), "starting recepta serve");

    let keystore = CredentialStore::new(&config.keystore.path);
    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    info!(
        database = config.storage.database_path.as_str(),
        "storage initialized"
    );

    let (manager, inbound) = ConnectionManager::new(
        transport,
        keystore,
        status_sink,
        ReconnectPolicy::from_config(&config.transport),
    );

    let queue = OutboundQueue::new(manager.clone(), DeliveryPolicy::from_config(&config.delivery));
    queue.start().await;

    let ingester = InboundIngester::new(
        store.clone() as Arc<dyn ConversationStore>,
        replier,
        queue.clone(),
    );
    let ingest_task = ingester.spawn(inbound, cancel.clone());

    manager.connect().await?;
    info!("recepta serving");

    cancel.cancelled().await;
    info!("shutdown requested");

    shutdown::drain_queue(&queue, DRAIN_TIMEOUT).await;
    queue.shutdown().await;
    manager.disconnect().await;

    if let Err(e) = ingest_task.await {
        warn!(error = %e, "ingestion task join failed");
    }
    drop(ingester);

    match Arc::try_unwrap(store) {
        Ok(store) => store.close().await?,
        Err(_) => debug!("storage still referenced, skipping checkpoint"),
    }

    info!("recepta serve shutdown complete");
    Ok(())
}
