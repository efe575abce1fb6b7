pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_PREV_HASH: &str = "0";
/// 2021-01-01T00:00:00Z. Shared by every node so independent chains fork from one root.
pub const GENESIS_TIMESTAMP: f64 = 1_609_459_200.0;
pub const DEFAULT_DIFFICULTY: usize = 2;
pub const DEFAULT_PEER_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
pub const DEFAULT_MAX_MINE_ATTEMPTS: u32 = 3;
