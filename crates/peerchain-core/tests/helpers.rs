#![allow(dead_code)]

use async_trait::async_trait;
use peerchain_core::constants::GENESIS_TIMESTAMP;
use peerchain_core::pow::{mine, CancelFlag};
use peerchain_core::{Block, Chain, ChainDump, PeerClient, PeerError, Transaction};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const DIFFICULTY: usize = 2;

/// How a fake peer answers.
#[derive(Clone)]
pub enum PeerBehavior {
    Serve(ChainDump),
    Unreachable,
    /// Never answers within any sane timeout.
    Hang,
}

/// In-memory stand-in for the HTTP peer client.
#[derive(Default)]
pub struct MockPeers {
    behaviors: Mutex<HashMap<String, PeerBehavior>>,
    broadcasts: Mutex<Vec<(String, Block)>>,
    registrations: Mutex<Vec<(String, String)>>,
}

impl MockPeers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, peer: &str, behavior: PeerBehavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(peer.to_string(), behavior);
    }

    pub fn serve(&self, peer: &str, chain: &Chain) {
        self.set(peer, PeerBehavior::Serve(chain.to_dump(vec![])));
    }

    pub fn broadcasts(&self) -> Vec<(String, Block)> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<(String, String)> {
        self.registrations.lock().unwrap().clone()
    }

    async fn answer(&self, peer: &str) -> Result<ChainDump, PeerError> {
        let behavior = self.behaviors.lock().unwrap().get(peer).cloned();
        match behavior {
            Some(PeerBehavior::Serve(dump)) => Ok(dump),
            Some(PeerBehavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PeerError::Timeout)
            }
            Some(PeerBehavior::Unreachable) | None => {
                Err(PeerError::Unreachable(format!("{peer}: connection refused")))
            }
        }
    }
}

#[async_trait]
impl PeerClient for MockPeers {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainDump, PeerError> {
        self.answer(peer).await
    }

    async fn broadcast_block(&self, peer: &str, block: &Block) -> Result<(), PeerError> {
        self.broadcasts
            .lock()
            .unwrap()
            .push((peer.to_string(), block.clone()));
        Ok(())
    }

    async fn register_with(&self, peer: &str, self_address: &str) -> Result<ChainDump, PeerError> {
        self.registrations
            .lock()
            .unwrap()
            .push((peer.to_string(), self_address.to_string()));
        self.answer(peer).await
    }
}

/// Mines `content` on top of `chain` and appends it.
pub fn extend(chain: &mut Chain, content: &str) {
    let tip = chain.tip();
    let mut block = Block::candidate(
        tip.index + 1,
        vec![Transaction::new("tester", content, 1_700_000_000.0)],
        1_700_000_001.0 + tip.index as f64,
        tip.hash_str(),
    );
    let seal = mine(&block, chain.difficulty(), &CancelFlag::new()).expect("uncancelled");
    block.nonce = seal.nonce;
    chain.append_block(block, &seal.hash).expect("extends tip");
}

/// A valid chain of `len` blocks whose contents are tagged with `label`, so
/// chains built with different labels diverge after genesis.
pub fn build_chain(len: usize, label: &str) -> Chain {
    let mut chain = Chain::new(DIFFICULTY, GENESIS_TIMESTAMP);
    for i in 1..len {
        extend(&mut chain, &format!("{label}-{i}"));
    }
    chain
}

/// A hex digest that meets the difficulty but hashes nothing in particular.
pub fn unrelated_digest() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let tail: [u8; 31] = rng.gen();
    format!("00{}", hex::encode(tail))
}
