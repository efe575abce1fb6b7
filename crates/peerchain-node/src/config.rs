use crate::constants::DEFAULT_LISTEN;
use clap::builder::RangedU64ValueParser;
use clap::{ArgAction, Parser};
use peerchain_core::constants::{DEFAULT_DIFFICULTY, DEFAULT_PEER_TIMEOUT_SECS, HASH_HEX_SIZE};
use peerchain_core::NodeConfig;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "peerchain-node")]
#[command(about = "Proof-of-work ledger node")]
pub struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long, env = "PEERCHAIN_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: String,

    /// Address announced to peers when joining a network (defaults to --listen)
    #[arg(long, env = "PEERCHAIN_ADVERTISE")]
    pub advertise: Option<String>,

    /// Leading zero hex characters required in block hashes (at most 64)
    #[arg(
        long,
        env = "PEERCHAIN_DIFFICULTY",
        default_value_t = DEFAULT_DIFFICULTY,
        value_parser = RangedU64ValueParser::<usize>::new().range(0..=HASH_HEX_SIZE as u64)
    )]
    pub difficulty: usize,

    /// Initial peers (host:port); repeat the flag or separate with commas
    #[arg(long = "peer", env = "PEERCHAIN_PEERS", value_delimiter = ',')]
    pub peers: Vec<String>,

    /// Per-peer timeout for chain fetches, in seconds
    #[arg(long, env = "PEERCHAIN_PEER_TIMEOUT_SECS", default_value_t = DEFAULT_PEER_TIMEOUT_SECS)]
    pub peer_timeout_secs: u64,

    /// Run reconciliation on a timer; 0 disables it
    #[arg(long, env = "PEERCHAIN_RECONCILE_INTERVAL_SECS", default_value_t = 0)]
    pub reconcile_interval_secs: u64,

    /// Reconcile with peers before serving GET /chain
    #[arg(
        long,
        env = "PEERCHAIN_RECONCILE_ON_READ",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub reconcile_on_read: bool,
}

impl Args {
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig::default()
            .with_difficulty(self.difficulty)
            .with_peer_timeout(self.peer_timeout())
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_secs(self.peer_timeout_secs)
    }

    pub fn advertise_address(&self) -> String {
        self.advertise.clone().unwrap_or_else(|| self.listen.clone())
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_secs > 0).then(|| Duration::from_secs(self.reconcile_interval_secs))
    }
}
