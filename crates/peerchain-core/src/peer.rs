use crate::error::{LedgerError, PeerError, Result};
use crate::{Block, ChainDump};
use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::sync::RwLock;

/// Outbound calls a node makes to its peers. The transport lives outside the
/// core; tests plug in an in-memory implementation.
#[async_trait]
pub trait PeerClient: Send + Sync + 'static {
    async fn fetch_chain(&self, peer: &str) -> std::result::Result<ChainDump, PeerError>;

    /// Fire-and-forget from the node's point of view; errors are only logged.
    async fn broadcast_block(&self, peer: &str, block: &Block) -> std::result::Result<(), PeerError>;

    /// Announces `self_address` to `peer` and returns the peer's chain dump,
    /// including the peers it knows about.
    async fn register_with(
        &self,
        peer: &str,
        self_address: &str,
    ) -> std::result::Result<ChainDump, PeerError>;
}

/// Set of known peer addresses (`host:port`).
#[derive(Debug, Default)]
pub struct PeerDirectory {
    peers: RwLock<BTreeSet<String>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the peer was new.
    pub async fn add(&self, address: &str) -> Result<bool> {
        let address = normalize(address)
            .ok_or_else(|| LedgerError::malformed("empty node address"))?;
        Ok(self.peers.write().await.insert(address))
    }

    pub async fn extend<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut peers = self.peers.write().await;
        peers.extend(addresses.into_iter().filter_map(|a| normalize(a.as_ref())));
    }

    pub async fn list(&self) -> Vec<String> {
        self.peers.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }
}

/// `http://host:port/` and `host:port` name the same peer.
pub fn normalize(address: &str) -> Option<String> {
    let trimmed = address.trim();
    let trimmed = trimmed.strip_prefix("http://").unwrap_or(trimmed);
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
