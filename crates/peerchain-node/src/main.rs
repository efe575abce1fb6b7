use clap::Parser;
use peerchain_core::Node;
use peerchain_node::api::{router, AppState};
use peerchain_node::client::HttpPeerClient;
use peerchain_node::config::Args;
use peerchain_node::spawn_reconciler;
use std::{net::SocketAddr, sync::Arc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let client = Arc::new(HttpPeerClient::new(args.peer_timeout())?);
    let node = Arc::new(Node::new(args.node_config(), client));
    for peer in &args.peers {
        if let Err(e) = node.register_peer(peer).await {
            warn!(peer = %peer, error = %e, "ignoring initial peer");
        }
    }

    if let Some(period) = args.reconcile_interval() {
        spawn_reconciler(node.clone(), period);
        info!(?period, "periodic reconciliation enabled");
    }

    let state = AppState {
        node,
        advertise: args.advertise_address(),
        reconcile_on_read: args.reconcile_on_read,
    };
    let app = router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("peerchain-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
