use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A rule a block or chain broke. Always recoverable: the offending block or
/// chain is rejected and node state is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("chain is empty")]
    EmptyChain,
    #[error("genesis block is invalid: {0}")]
    BadGenesis(&'static str),
    #[error("block {index} carries no hash")]
    MissingHash { index: u64 },
    #[error("block {index}: stored hash {stored} does not match recomputed {computed}")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },
    #[error("block {index}: hash {hash} does not meet difficulty {difficulty}")]
    InsufficientWork {
        index: u64,
        hash: String,
        difficulty: usize,
    },
    #[error("block {index}: prev_hash {found} does not link to {expected}")]
    BrokenLink {
        index: u64,
        expected: String,
        found: String,
    },
    #[error("block at position {position} has index {found}")]
    BadIndex { position: u64, found: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    #[error("peer timed out")]
    Timeout,
    #[error("bad response from peer: {0}")]
    BadResponse(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("chain dump is tampered: {0}")]
    TamperedChainDump(ValidationError),
    #[error("peer {peer}: {source}")]
    PeerUnreachable {
        peer: String,
        #[source]
        source: PeerError,
    },
    #[error("mining aborted after {attempts} attempts; transactions returned to the pool")]
    MiningAborted { attempts: u32 },
    #[error("mining task failed: {0}")]
    MiningTask(String),
}

impl LedgerError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        LedgerError::MalformedInput(msg.into())
    }

    /// Client-side mistakes, as opposed to peer or node trouble.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation(_)
                | LedgerError::MalformedInput(_)
                | LedgerError::TamperedChainDump(_)
        )
    }
}
