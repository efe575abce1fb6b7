//! `reqwest`-backed [`PeerClient`] speaking the node's own HTTP API.
use crate::constants::{BROADCAST_TIMEOUT_SECS, HTTP_CONNECT_TIMEOUT_SECS};
use async_trait::async_trait;
use peerchain_core::{Block, ChainDump, PeerClient, PeerError};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct NodeAddress<'a> {
    node_address: &'a str,
}

#[derive(Clone, Debug)]
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// `timeout` bounds a whole request, body included.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

/// Peers are stored as `host:port`; an explicit scheme is kept as given.
pub fn peer_url(peer: &str, path: &str) -> String {
    let base = peer.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}{path}")
    } else {
        format!("http://{base}{path}")
    }
}

fn map_err(err: reqwest::Error) -> PeerError {
    if err.is_timeout() {
        PeerError::Timeout
    } else if err.is_connect() || err.is_request() {
        PeerError::Unreachable(err.to_string())
    } else {
        PeerError::BadResponse(err.to_string())
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainDump, PeerError> {
        // the peer must not start its own reconciliation to answer us
        self.http
            .get(peer_url(peer, "/chain?reconcile=false"))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_err)?
            .json::<ChainDump>()
            .await
            .map_err(map_err)
    }

    async fn broadcast_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        self.http
            .post(peer_url(peer, "/add_block"))
            .timeout(Duration::from_secs(BROADCAST_TIMEOUT_SECS))
            .json(block)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_err)?;
        Ok(())
    }

    async fn register_with(&self, peer: &str, self_address: &str) -> Result<ChainDump, PeerError> {
        self.http
            .post(peer_url(peer, "/add_nodes"))
            .json(&NodeAddress {
                node_address: self_address,
            })
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(map_err)?
            .json::<ChainDump>()
            .await
            .map_err(map_err)
    }
}
