use crate::error::{LedgerError, Result, ValidationError};
use crate::pow::{mine, CancelFlag};
use crate::validate::Validator;
use crate::{Block, ChainDump};
use tracing::{debug, info};

/// Ordered, append-only sequence of sealed blocks rooted at a mined genesis.
///
/// Never empty. Grows only through [`Chain::append_block`] and is otherwise
/// only ever swapped wholesale through [`Chain::replace`]. Callers that share
/// a chain across tasks hold it behind a single lock so those two mutators
/// are serialized.
#[derive(Clone, Debug)]
pub struct Chain {
    blocks: Vec<Block>,
    validator: Validator,
}

impl Chain {
    /// Mines a fresh genesis block at `genesis_timestamp`.
    pub fn new(difficulty: usize, genesis_timestamp: f64) -> Self {
        let genesis = Block::genesis(genesis_timestamp);
        // never cancelled, so a seal is always found
        let seal = mine(&genesis, difficulty, &CancelFlag::new());
        let genesis = match seal {
            Some(seal) => genesis.seal(seal),
            None => unreachable!("uncancelled search always returns a seal"),
        };
        debug!(hash = %genesis.hash_str(), "genesis mined");
        Self {
            blocks: vec![genesis],
            validator: Validator::new(difficulty),
        }
    }

    /// Rebuilds a chain from peer-supplied blocks, validating all of them.
    /// A dump that fails any check is rejected as a whole.
    pub fn from_blocks(blocks: Vec<Block>, difficulty: usize) -> Result<Self> {
        let validator = Validator::new(difficulty);
        validator
            .check_chain(&blocks)
            .map_err(LedgerError::TamperedChainDump)?;
        Ok(Self { blocks, validator })
    }

    pub fn from_dump(dump: ChainDump, difficulty: usize) -> Result<Self> {
        if dump.length != dump.chain.len() {
            return Err(LedgerError::malformed(format!(
                "chain dump claims length {} but carries {} blocks",
                dump.length,
                dump.chain.len()
            )));
        }
        Self::from_blocks(dump.chain, difficulty)
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    pub fn difficulty(&self) -> usize {
        self.validator.difficulty()
    }

    pub fn tip(&self) -> &Block {
        // non-empty by construction
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> &str {
        self.tip().hash_str()
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get(&self, index: u64) -> Option<&Block> {
        usize::try_from(index).ok().and_then(|i| self.blocks.get(i))
    }

    /// Appends `block` sealed with `claimed_hash` on top of the current tip.
    ///
    /// Rejected when the block does not extend the tip (index or prev_hash)
    /// or when `claimed_hash` is not a valid proof of work for it.
    pub fn append_block(&mut self, mut block: Block, claimed_hash: &str) -> Result<u64> {
        let tip = self.tip();
        if block.prev_hash != tip.hash_str() {
            return Err(ValidationError::BrokenLink {
                index: block.index,
                expected: tip.hash_str().to_string(),
                found: block.prev_hash,
            }
            .into());
        }
        if block.index != tip.index + 1 {
            return Err(ValidationError::BadIndex {
                position: tip.index + 1,
                found: block.index,
            }
            .into());
        }
        self.validator.check_proof_of_work(&block, claimed_hash)?;

        block.hash = Some(claimed_hash.to_string());
        let index = block.index;
        self.blocks.push(block);
        info!(index, hash = %claimed_hash, "block appended");
        Ok(index)
    }

    /// Swaps in `other` wholesale. Only the reconciler calls this, after it
    /// has established that `other` is valid and strictly longer.
    pub fn replace(&mut self, other: Chain) {
        info!(from = self.len(), to = other.len(), "chain replaced");
        self.blocks = other.blocks;
    }

    pub fn to_dump(&self, peers: Vec<String>) -> ChainDump {
        ChainDump::new(self.blocks.clone(), peers)
    }
}
