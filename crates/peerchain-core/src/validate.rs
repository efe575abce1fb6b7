use crate::constants::GENESIS_PREV_HASH;
use crate::error::ValidationError;
use crate::pow::meets_difficulty;
use crate::Block;

/// Stateless checks against a fixed difficulty. Every method is a pure
/// function of its arguments and never mutates the blocks it inspects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validator {
    difficulty: usize,
}

impl Validator {
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// True iff `claimed_hash` meets the difficulty and equals the digest of
    /// `block` (whose own `hash` field, if any, is ignored).
    pub fn is_valid_proof_of_work(&self, block: &Block, claimed_hash: &str) -> bool {
        self.check_proof_of_work(block, claimed_hash).is_ok()
    }

    pub fn check_proof_of_work(&self, block: &Block, claimed_hash: &str) -> Result<(), ValidationError> {
        if !meets_difficulty(claimed_hash, self.difficulty) {
            return Err(ValidationError::InsufficientWork {
                index: block.index,
                hash: claimed_hash.to_string(),
                difficulty: self.difficulty,
            });
        }
        let computed = block.digest();
        if computed != claimed_hash {
            return Err(ValidationError::HashMismatch {
                index: block.index,
                stored: claimed_hash.to_string(),
                computed,
            });
        }
        Ok(())
    }

    pub fn is_chain_valid(&self, blocks: &[Block]) -> bool {
        self.check_chain(blocks).is_ok()
    }

    /// Walks the chain from genesis and reports the first rule broken.
    pub fn check_chain(&self, blocks: &[Block]) -> Result<(), ValidationError> {
        let genesis = blocks.first().ok_or(ValidationError::EmptyChain)?;
        if genesis.prev_hash != GENESIS_PREV_HASH {
            return Err(ValidationError::BadGenesis("prev_hash must be \"0\""));
        }
        if !genesis.transactions.is_empty() {
            return Err(ValidationError::BadGenesis("genesis carries transactions"));
        }

        let mut prev_hash = GENESIS_PREV_HASH;
        for (position, block) in blocks.iter().enumerate() {
            let position = position as u64;
            if block.index != position {
                return Err(ValidationError::BadIndex {
                    position,
                    found: block.index,
                });
            }
            let stored = block
                .hash
                .as_deref()
                .ok_or(ValidationError::MissingHash { index: block.index })?;
            self.check_proof_of_work(block, stored)?;
            if block.prev_hash != prev_hash {
                return Err(ValidationError::BrokenLink {
                    index: block.index,
                    expected: prev_hash.to_string(),
                    found: block.prev_hash.clone(),
                });
            }
            prev_hash = stored;
        }
        Ok(())
    }
}
