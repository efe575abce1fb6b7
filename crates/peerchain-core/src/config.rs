use crate::constants::{
    DEFAULT_DIFFICULTY, DEFAULT_MAX_CONCURRENT_FETCHES, DEFAULT_MAX_MINE_ATTEMPTS,
    DEFAULT_PEER_TIMEOUT_SECS, GENESIS_TIMESTAMP,
};
use std::time::Duration;

/// Settings fixed for the lifetime of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeConfig {
    /// Leading `'0'` hex characters required in every block hash.
    pub difficulty: usize,
    pub genesis_timestamp: f64,
    /// Per-peer budget for a chain fetch during reconciliation.
    pub peer_timeout: Duration,
    pub max_concurrent_fetches: usize,
    /// Mining retries when the tip moves under an in-flight search.
    pub max_mine_attempts: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            genesis_timestamp: GENESIS_TIMESTAMP,
            peer_timeout: Duration::from_secs(DEFAULT_PEER_TIMEOUT_SECS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            max_mine_attempts: DEFAULT_MAX_MINE_ATTEMPTS,
        }
    }
}

impl NodeConfig {
    pub fn with_difficulty(mut self, difficulty: usize) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_genesis_timestamp(mut self, timestamp: f64) -> Self {
        self.genesis_timestamp = timestamp;
        self
    }

    pub fn with_peer_timeout(mut self, timeout: Duration) -> Self {
        self.peer_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, n: usize) -> Self {
        self.max_concurrent_fetches = n.max(1);
        self
    }

    pub fn with_max_mine_attempts(mut self, n: u32) -> Self {
        self.max_mine_attempts = n.max(1);
        self
    }
}
