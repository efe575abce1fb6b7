use crate::pow::{mine_parallel, CancelFlag, Seal};
use crate::Block;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// A proof-of-work search running on the blocking pool. The outcome comes
/// back over a oneshot channel: `Some(seal)` on success, `None` if cancelled.
pub struct MiningJob {
    cancel: CancelFlag,
    outcome: oneshot::Receiver<Option<Seal>>,
}

impl MiningJob {
    pub fn spawn(candidate: Block, difficulty: usize) -> Self {
        let cancel = CancelFlag::new();
        let (tx, outcome) = oneshot::channel();
        let flag = cancel.clone();
        tokio::task::spawn_blocking(move || {
            debug!(index = candidate.index, difficulty, "mining started");
            let seal = mine_parallel(&candidate, difficulty, &flag);
            match &seal {
                Some(seal) => info!(
                    index = candidate.index,
                    nonce = seal.nonce,
                    hash = %seal.hash,
                    "mined block"
                ),
                None => debug!(index = candidate.index, "mining cancelled"),
            }
            // the receiver may have gone away; nothing to do then
            let _ = tx.send(seal);
        });
        Self { cancel, outcome }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the worker. A worker that died without reporting counts as
    /// cancelled.
    pub async fn wait(self) -> Option<Seal> {
        self.outcome.await.ok().flatten()
    }
}
