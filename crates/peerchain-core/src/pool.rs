use crate::error::Result;
use crate::Transaction;
use tokio::sync::Mutex;
use tracing::debug;

/// Unconfirmed transactions waiting for the next mined block.
#[derive(Debug, Default)]
pub struct TransactionPool {
    pending: Mutex<Vec<Transaction>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects transactions whose `author` or `content` is empty. The caller
    /// has already stamped the transaction.
    pub async fn submit(&self, tx: Transaction) -> Result<()> {
        tx.validate()?;
        let mut pending = self.pending.lock().await;
        pending.push(tx);
        debug!(pending = pending.len(), "transaction queued");
        Ok(())
    }

    /// Takes every pending transaction in one step.
    pub async fn drain_all(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.pending.lock().await)
    }

    /// Puts transactions from an aborted mining attempt back in front of
    /// anything submitted meanwhile, preserving their order.
    pub async fn requeue(&self, txs: Vec<Transaction>) {
        if txs.is_empty() {
            return;
        }
        let mut pending = self.pending.lock().await;
        let newer = std::mem::replace(&mut *pending, txs);
        pending.extend(newer);
    }

    pub async fn snapshot(&self) -> Vec<Transaction> {
        self.pending.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerError;
    use std::sync::Arc;

    #[tokio::test]
    async fn submit_then_drain() {
        let pool = TransactionPool::new();
        pool.submit(Transaction::new("a", "one", 1.0)).await.unwrap();
        pool.submit(Transaction::new("b", "two", 2.0)).await.unwrap();
        assert_eq!(pool.len().await, 2);

        let drained = pool.drain_all().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].content, "one");
        assert!(pool.is_empty().await);
        assert!(pool.drain_all().await.is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_missing_fields() {
        let pool = TransactionPool::new();
        let err = pool.submit(Transaction::new("", "x", 1.0)).await.unwrap_err();
        assert!(matches!(err, LedgerError::MalformedInput(_)));
        assert!(pool.submit(Transaction::new("a", "", 1.0)).await.is_err());
        assert!(pool.is_empty().await);
    }

    #[tokio::test]
    async fn requeue_goes_in_front() {
        let pool = TransactionPool::new();
        pool.submit(Transaction::new("a", "old", 1.0)).await.unwrap();
        let drained = pool.drain_all().await;
        pool.submit(Transaction::new("b", "new", 2.0)).await.unwrap();
        pool.requeue(drained).await;

        let contents: Vec<_> = pool.snapshot().await.into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["old", "new"]);
    }

    #[tokio::test]
    async fn concurrent_submit_and_drain_lose_nothing() {
        let pool = Arc::new(TransactionPool::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                pool.submit(Transaction::new("a", format!("tx{i}"), i as f64))
                    .await
                    .unwrap();
            }));
        }
        let mut drained = Vec::new();
        for _ in 0..5 {
            drained.extend(pool.drain_all().await);
            tokio::task::yield_now().await;
        }
        for h in handles {
            h.await.unwrap();
        }
        drained.extend(pool.drain_all().await);

        let mut contents: Vec<_> = drained.into_iter().map(|t| t.content).collect();
        contents.sort();
        assert_eq!(contents.len(), 50);
        contents.dedup();
        assert_eq!(contents.len(), 50);
    }
}
