//! The node: owns the chain, the pool and the peer directory, and is the only
//! way the transport layer touches them.
use crate::chain::Chain;
use crate::config::NodeConfig;
use crate::consensus::Reconciler;
use crate::error::{LedgerError, Result};
use crate::mine::MiningJob;
use crate::peer::{normalize, PeerClient, PeerDirectory};
use crate::pool::TransactionPool;
use crate::pow::CancelFlag;
use crate::{unix_now, Block, ChainDump, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    /// The pool was empty.
    NothingToMine,
    Mined { index: u64 },
    /// Stopped through [`Node::cancel_mining`]; the transactions are back in
    /// the pool.
    Cancelled,
}

/// The search in flight and the tip it extends.
struct ActiveJob {
    prev_hash: String,
    cancel: CancelFlag,
}

pub struct Node<P: PeerClient> {
    config: NodeConfig,
    chain: Arc<RwLock<Chain>>,
    pool: Arc<TransactionPool>,
    peers: Arc<PeerDirectory>,
    reconciler: Reconciler,
    client: Arc<P>,
    // one mining request at a time
    mine_lock: Arc<Mutex<()>>,
    current_job: Arc<Mutex<Option<ActiveJob>>>,
}

impl<P: PeerClient> Node<P> {
    pub fn new(config: NodeConfig, client: Arc<P>) -> Self {
        let chain = Chain::new(config.difficulty, config.genesis_timestamp);
        info!(
            difficulty = config.difficulty,
            genesis = %chain.genesis().hash_str(),
            "node initialised"
        );
        Self {
            reconciler: Reconciler::from_config(&config),
            chain: Arc::new(RwLock::new(chain)),
            pool: Arc::new(TransactionPool::new()),
            peers: Arc::new(PeerDirectory::new()),
            client,
            mine_lock: Arc::new(Mutex::new(())),
            current_job: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub async fn submit_transaction(&self, tx: Transaction) -> Result<()> {
        self.pool.submit(tx).await
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.snapshot().await
    }

    /// Seals every pending transaction into one new block.
    ///
    /// If the tip moves while the search runs (a peer block or a chain
    /// replacement), the search is cancelled and restarted on the new tip, up
    /// to `max_mine_attempts` times. Whatever happens, drained transactions
    /// end up either in the appended block or back in the pool.
    ///
    /// The work runs on its own task: dropping the returned future detaches
    /// it rather than abandoning the drained transactions.
    pub async fn mine(&self) -> Result<MineOutcome> {
        let guard = Arc::clone(&self.mine_lock).lock_owned().await;
        let miner = Miner {
            difficulty: self.config.difficulty,
            max_attempts: self.config.max_mine_attempts,
            chain: Arc::clone(&self.chain),
            pool: Arc::clone(&self.pool),
            peers: Arc::clone(&self.peers),
            client: Arc::clone(&self.client),
            current_job: Arc::clone(&self.current_job),
        };
        let task = tokio::spawn(async move {
            let _guard = guard;
            miner.run().await
        });
        task.await
            .map_err(|e| LedgerError::MiningTask(e.to_string()))?
    }

    /// Returns whether a search was in flight.
    pub async fn cancel_mining(&self) -> bool {
        match self.current_job.lock().await.as_ref() {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels the search in flight only if it no longer extends `tip_hash`.
    async fn cancel_stale_mining(&self, tip_hash: &str) -> bool {
        match self.current_job.lock().await.as_ref() {
            Some(job) if job.prev_hash != tip_hash => {
                job.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Appends a block a peer mined. `block.hash` is the claimed proof.
    pub async fn accept_block(&self, block: Block) -> Result<u64> {
        let claimed = block
            .hash
            .clone()
            .ok_or_else(|| LedgerError::malformed("block is missing `hash`"))?;
        let appended = {
            let mut chain = self.chain.write().await;
            chain
                .append_block(block, &claimed)
                .map(|index| (index, chain.tip_hash().to_string()))
        };
        match appended {
            Ok((index, tip)) => {
                self.cancel_stale_mining(&tip).await;
                Ok(index)
            }
            Err(e) => {
                warn!(error = %e, "rejected peer block");
                Err(e)
            }
        }
    }

    /// One fork-resolution pass over every known peer. Returns whether the
    /// local chain was replaced.
    pub async fn reconcile(&self) -> bool {
        let peers = self.peers.list().await;
        if peers.is_empty() {
            return false;
        }
        let replaced = self
            .reconciler
            .reconcile(&self.chain, &peers, self.client.as_ref())
            .await;
        if replaced {
            let tip = self.chain.read().await.tip_hash().to_string();
            self.cancel_stale_mining(&tip).await;
        }
        replaced
    }

    /// Returns whether the peer was new.
    pub async fn register_peer(&self, address: &str) -> Result<bool> {
        let added = self.peers.add(address).await?;
        if added {
            info!(peer = %address, "peer registered");
        }
        Ok(added)
    }

    /// Joins the network `remote` belongs to: announces `self_address` to it,
    /// learns its peers and adopts its chain if that chain is valid and
    /// strictly longer. A tampered dump is discarded whole and nothing about
    /// the local node changes. Returns whether the chain was adopted.
    pub async fn register_with(&self, remote: &str, self_address: &str) -> Result<bool> {
        let remote = normalize(remote).ok_or_else(|| LedgerError::malformed("empty node address"))?;
        let remote = remote.as_str();
        let dump = self
            .client
            .register_with(remote, self_address)
            .await
            .map_err(|source| LedgerError::PeerUnreachable {
                peer: remote.to_string(),
                source,
            })?;
        let remote_peers = dump.peers.clone();
        let candidate = Chain::from_dump(dump, self.config.difficulty)?;

        let adopted_tip = {
            let mut chain = self.chain.write().await;
            if candidate.len() > chain.len() {
                chain.replace(candidate);
                Some(chain.tip_hash().to_string())
            } else {
                None
            }
        };
        let adopted = adopted_tip.is_some();
        if let Some(tip) = adopted_tip {
            self.cancel_stale_mining(&tip).await;
        }

        self.peers.add(remote).await?;
        let me = normalize(self_address);
        self.peers
            .extend(remote_peers.into_iter().filter(|p| normalize(p) != me))
            .await;
        let known = self.peers.len().await;
        info!(remote = %remote, adopted, peers = known, "joined network");
        Ok(adopted)
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.list().await
    }

    pub async fn chain_dump(&self) -> ChainDump {
        let peers = self.peers.list().await;
        self.chain.read().await.to_dump(peers)
    }

    pub async fn chain_len(&self) -> usize {
        self.chain.read().await.len()
    }

    pub async fn tip(&self) -> Block {
        self.chain.read().await.tip().clone()
    }

    pub async fn chain_snapshot(&self) -> Chain {
        self.chain.read().await.clone()
    }
}

/// Everything a mining run touches, detached from the [`Node`] borrow.
struct Miner<P> {
    difficulty: usize,
    max_attempts: u32,
    chain: Arc<RwLock<Chain>>,
    pool: Arc<TransactionPool>,
    peers: Arc<PeerDirectory>,
    client: Arc<P>,
    current_job: Arc<Mutex<Option<ActiveJob>>>,
}

impl<P: PeerClient> Miner<P> {
    async fn run(self) -> Result<MineOutcome> {
        let txs = self.pool.drain_all().await;
        if txs.is_empty() {
            return Ok(MineOutcome::NothingToMine);
        }

        let attempts = self.max_attempts;
        for attempt in 1..=attempts {
            let (index, prev_hash) = {
                let chain = self.chain.read().await;
                (chain.tip().index + 1, chain.tip_hash().to_string())
            };
            let candidate = Block::candidate(index, txs.clone(), unix_now(), prev_hash.clone());
            let job = MiningJob::spawn(candidate.clone(), self.difficulty);
            *self.current_job.lock().await = Some(ActiveJob {
                prev_hash: prev_hash.clone(),
                cancel: job.cancel_flag(),
            });
            let seal = job.wait().await;
            self.current_job.lock().await.take();

            let Some(seal) = seal else {
                if self.chain.read().await.tip_hash() != prev_hash {
                    debug!(attempt, "tip moved during mining; retrying");
                    continue;
                }
                self.pool.requeue(txs).await;
                return Ok(MineOutcome::Cancelled);
            };

            let mut block = candidate;
            block.nonce = seal.nonce;
            let mut chain = self.chain.write().await;
            let appended = chain.append_block(block, &seal.hash);
            match appended {
                Ok(index) => {
                    let sealed = chain.tip().clone();
                    drop(chain);
                    self.broadcast(sealed).await;
                    return Ok(MineOutcome::Mined { index });
                }
                Err(LedgerError::Validation(e)) => {
                    warn!(attempt, error = %e, "mined block went stale; retrying");
                }
                Err(e) => {
                    drop(chain);
                    self.pool.requeue(txs).await;
                    return Err(e);
                }
            }
        }

        self.pool.requeue(txs).await;
        Err(LedgerError::MiningAborted { attempts })
    }

    async fn broadcast(&self, block: Block) {
        for peer in self.peers.list().await {
            let client = Arc::clone(&self.client);
            let block = block.clone();
            tokio::spawn(async move {
                if let Err(e) = client.broadcast_block(&peer, &block).await {
                    warn!(peer = %peer, index = block.index, error = %e, "broadcast failed");
                }
            });
        }
    }
}
