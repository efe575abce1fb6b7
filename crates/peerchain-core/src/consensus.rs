//! Longest-valid-chain fork resolution.
//!
//! Every peer's chain is fetched (concurrently, bounded, each under its own
//! timeout), rebuilt and validated. The local chain is replaced only by a
//! valid chain strictly longer than it; among several, the longest wins and
//! on equal length the peer listed first wins. Running it again without new
//! peer data changes nothing.
use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::error::{LedgerError, PeerError};
use crate::peer::PeerClient;
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct Reconciler {
    difficulty: usize,
    timeout: Duration,
    max_concurrent: usize,
}

impl Reconciler {
    pub fn new(difficulty: usize, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            difficulty,
            timeout,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(
            config.difficulty,
            config.peer_timeout,
            config.max_concurrent_fetches,
        )
    }

    /// Returns whether the local chain was replaced.
    pub async fn reconcile<P: PeerClient>(
        &self,
        chain: &RwLock<Chain>,
        peers: &[String],
        client: &P,
    ) -> bool {
        let local_len = chain.read().await.len();
        let Some((peer, best)) = self.best_candidate(local_len, peers, client).await else {
            debug!(local_len, peers = peers.len(), "no longer valid chain found");
            return false;
        };

        let mut local = chain.write().await;
        // the local chain may have grown while we were fetching
        if best.len() <= local.len() {
            debug!(peer = %peer, candidate = best.len(), local = local.len(), "candidate overtaken");
            return false;
        }
        info!(peer = %peer, length = best.len(), "adopting longer chain");
        local.replace(best);
        true
    }

    /// Longest valid peer chain strictly longer than `local_len`.
    pub async fn best_candidate<P: PeerClient>(
        &self,
        local_len: usize,
        peers: &[String],
        client: &P,
    ) -> Option<(String, Chain)> {
        let fetched: Vec<(String, Result<Chain, LedgerError>)> = stream::iter(peers.iter().cloned())
            .map(|peer| async move {
                let result = self.fetch_valid_chain(&peer, client).await;
                (peer, result)
            })
            // `buffered` keeps peer order, which makes tie-breaking deterministic
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut best: Option<(String, Chain)> = None;
        let mut best_len = local_len;
        for (peer, result) in fetched {
            match result {
                Ok(candidate) if candidate.len() > best_len => {
                    debug!(peer = %peer, length = candidate.len(), "new best candidate");
                    best_len = candidate.len();
                    best = Some((peer, candidate));
                }
                Ok(candidate) => {
                    debug!(peer = %peer, length = candidate.len(), best_len, "peer chain not longer");
                }
                Err(e) => warn!(peer = %peer, error = %e, "skipping peer"),
            }
        }
        best
    }

    async fn fetch_valid_chain<P: PeerClient>(&self, peer: &str, client: &P) -> Result<Chain, LedgerError> {
        let dump = match tokio::time::timeout(self.timeout, client.fetch_chain(peer)).await {
            Ok(Ok(dump)) => dump,
            Ok(Err(source)) => {
                return Err(LedgerError::PeerUnreachable {
                    peer: peer.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(LedgerError::PeerUnreachable {
                    peer: peer.to_string(),
                    source: PeerError::Timeout,
                })
            }
        };
        Chain::from_dump(dump, self.difficulty)
    }
}
