use crate::Block;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Result of a successful nonce search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seal {
    pub nonce: u64,
    pub hash: String,
}

/// Shared stop signal for an in-flight search.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub fn count_leading_zero_chars(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    count_leading_zero_chars(hash) >= difficulty
}

/// Sequential search: nonce 0, 1, 2, ... until the digest starts with
/// `difficulty` zero characters. Returns `None` only when cancelled.
pub fn mine(block: &Block, difficulty: usize, cancel: &CancelFlag) -> Option<Seal> {
    let mut attempt = block.clone();
    attempt.nonce = 0;
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        let hash = attempt.digest();
        if meets_difficulty(&hash, difficulty) {
            return Some(Seal {
                nonce: attempt.nonce,
                hash,
            });
        }
        attempt.nonce = attempt.nonce.wrapping_add(1);
    }
}

/// Parallel search over the whole nonce space. `find_first` keeps the lowest
/// satisfying nonce, so the seal is identical to the one `mine` would find.
pub fn mine_parallel(block: &Block, difficulty: usize, cancel: &CancelFlag) -> Option<Seal> {
    let found = (0u64..u64::MAX)
        .into_par_iter()
        .map_init(
            || block.clone(),
            |attempt, nonce| {
                attempt.nonce = nonce;
                (nonce, attempt.digest())
            },
        )
        .find_first(|(_, hash)| cancel.is_cancelled() || meets_difficulty(hash, difficulty));

    match found {
        Some((nonce, hash)) if meets_difficulty(&hash, difficulty) => Some(Seal { nonce, hash }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transaction;

    fn candidate() -> Block {
        let txs = vec![
            Transaction::new("alice", "hello", 1_600_000_000.0),
            Transaction::new("bob", "hi alice", 1_600_000_100.0),
        ];
        Block::candidate(1, txs, 1_600_000_200.0, "00aa")
    }

    #[test]
    fn leading_zero_chars_examples() {
        assert_eq!(count_leading_zero_chars("ffff"), 0);
        assert_eq!(count_leading_zero_chars("0fff"), 1);
        assert_eq!(count_leading_zero_chars("000a"), 3);
        assert_eq!(count_leading_zero_chars("0000"), 4);
        assert_eq!(count_leading_zero_chars(""), 0);
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0ab0", 2));
        assert!(meets_difficulty("abcd", 0));
    }

    #[test]
    fn mine_meets_difficulty() {
        let block = candidate();
        let seal = mine(&block, 3, &CancelFlag::new()).unwrap();
        assert!(seal.hash.starts_with("000"));

        let mut sealed = block.clone();
        sealed.nonce = seal.nonce;
        assert_eq!(sealed.digest(), seal.hash);
    }

    #[test]
    fn mine_finds_the_lowest_nonce() {
        let block = candidate();
        let seal = mine(&block, 2, &CancelFlag::new()).unwrap();
        let mut probe = block.clone();
        for nonce in 0..seal.nonce {
            probe.nonce = nonce;
            assert!(!meets_difficulty(&probe.digest(), 2));
        }
    }

    #[test]
    fn mine_does_not_touch_the_input() {
        let block = candidate();
        let _ = mine(&block, 2, &CancelFlag::new());
        assert_eq!(block, candidate());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let block = candidate();
        let seq = mine(&block, 2, &CancelFlag::new()).unwrap();
        let par = mine_parallel(&block, 2, &CancelFlag::new()).unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn cancelled_search_returns_none() {
        let flag = CancelFlag::new();
        flag.cancel();
        // 64 zero characters is unreachable; only cancellation can end the search
        assert_eq!(mine(&candidate(), 64, &flag), None);
        assert_eq!(mine_parallel(&candidate(), 64, &flag), None);
    }

    #[test]
    fn zero_difficulty_accepts_nonce_zero() {
        let seal = mine(&candidate(), 0, &CancelFlag::new()).unwrap();
        assert_eq!(seal.nonce, 0);
    }
}
