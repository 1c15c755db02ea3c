// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `courier serve` command implementation.
//!
//! Wires the storage layer, delivery engine, background scheduler, and
//! webhook gateway together, then runs until a shutdown signal arrives.
//! Shutdown drains in order: the gateway stops accepting requests, the
//! scheduler loops finish their current pass, then the WAL is
//! checkpointed.

use std::sync::Arc;

use courier_config::model::CourierConfig;
use courier_core::{BlockStore, CourierError, ExecTarget};
use courier_delivery::{DeliveryEngine, HttpBlockStore, HttpExecTarget, Scheduler};
use courier_gateway::server::{start_server, GatewayState};
use courier_storage::{Database, SqliteGraph};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runs the `courier serve` command.
pub async fn run_serve(config: CourierConfig) -> Result<(), CourierError> {
    init_tracing(&config.server.log_level);

    info!("starting courier serve");

    let db = Database::open(&config.storage.database_path).await?;
    let config = Arc::new(config);

    let graph = Arc::new(SqliteGraph::new(db.clone()));
    let exec: Arc<dyn ExecTarget> = Arc::new(HttpExecTarget::new(&config.exec)?);
    let blocks: Arc<dyn BlockStore> = Arc::new(HttpBlockStore::new(&config.blocks)?);
    let engine = Arc::new(DeliveryEngine::new(
        db.clone(),
        graph,
        exec,
        blocks,
        config.delivery.clone(),
    ));

    let cancel = install_signal_handler();

    let scheduler = Scheduler::new(
        engine.clone(),
        config.scheduler.clone(),
        config.delivery.clone(),
    );
    let scheduler_handles = scheduler.spawn(cancel.clone());

    let state = GatewayState::new(db.clone(), config, engine);
    start_server(state, cancel.clone()).await?;

    // The gateway only returns once `cancel` fired; wait for the scheduler
    // loops to notice it too.
    for handle in scheduler_handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "scheduler task aborted");
        }
    }

    db.close().await?;
    info!("courier serve shutdown complete");
    Ok(())
}

/// A cancellation token that fires on Ctrl-C / SIGTERM delivery.
fn install_signal_handler() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            trigger.cancel();
        }
    });
    cancel
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("courier={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
