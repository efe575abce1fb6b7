//! HTTP transport and process wiring around `peerchain-core`.
pub mod api;
pub mod client;
pub mod config;
mod constants;

use api::SharedNode;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Runs a reconciliation pass every `period`, starting one period from now.
pub fn spawn_reconciler(node: SharedNode, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if node.reconcile().await {
                let length = node.chain_len().await;
                info!(length, "periodic reconciliation replaced the chain");
            } else {
                debug!("periodic reconciliation: chain kept");
            }
        }
    })
}
