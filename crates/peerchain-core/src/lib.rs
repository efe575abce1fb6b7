//! In-memory proof-of-work ledger: hash-linked blocks, mining, validation and
//! longest-valid-chain reconciliation across peers.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

pub mod chain;
pub mod config;
pub mod consensus;
pub mod constants;
pub mod error;
pub mod hash;
pub mod mine;
pub mod node;
pub mod peer;
pub mod pool;
pub mod pow;
pub mod validate;

pub use chain::Chain;
pub use config::NodeConfig;
pub use error::{LedgerError, PeerError, Result, ValidationError};
pub use node::{MineOutcome, Node};
pub use peer::{PeerClient, PeerDirectory};
pub use pool::TransactionPool;
pub use pow::{CancelFlag, Seal};
pub use validate::Validator;

/// Seconds since the Unix epoch with sub-second precision.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// An accepted transaction. `author`, `content` and `timestamp` are always
/// present; anything else the client sent rides along in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub author: String,
    pub content: String,
    pub timestamp: f64,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Transaction {
    pub fn new(author: impl Into<String>, content: impl Into<String>, timestamp: f64) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
            timestamp,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Required fields must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.author.is_empty() {
            return Err(LedgerError::malformed("transaction is missing `author`"));
        }
        if self.content.is_empty() {
            return Err(LedgerError::malformed("transaction is missing `content`"));
        }
        Ok(())
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map: Map<String, Value> = self
            .extra
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("author".into(), Value::from(self.author.as_str()));
        map.insert("content".into(), Value::from(self.content.as_str()));
        map.insert("timestamp".into(), Value::from(self.timestamp));
        Value::Object(map)
    }
}

/// A transaction as it arrives at the submission boundary, before the
/// required fields have been checked and before it is timestamped.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    pub author: Option<String>,
    pub content: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NewTransaction {
    pub fn into_transaction(mut self, timestamp: f64) -> Result<Transaction> {
        let author = self
            .author
            .filter(|a| !a.is_empty())
            .ok_or_else(|| LedgerError::malformed("transaction is missing `author`"))?;
        let content = self
            .content
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LedgerError::malformed("transaction is missing `content`"))?;
        // the server's clock is authoritative
        self.extra.remove("timestamp");
        Ok(Transaction {
            author,
            content,
            timestamp,
            extra: self.extra,
        })
    }
}

/// A block is a *candidate* while `hash` is `None` and *sealed* once a
/// proof-of-work seal has been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub transactions: Vec<Transaction>,
    pub timestamp: f64,
    pub prev_hash: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl Block {
    pub fn candidate(
        index: u64,
        transactions: Vec<Transaction>,
        timestamp: f64,
        prev_hash: impl Into<String>,
    ) -> Self {
        Self {
            index,
            transactions,
            timestamp,
            prev_hash: prev_hash.into(),
            nonce: 0,
            hash: None,
        }
    }

    /// Unsealed genesis candidate; it still has to be mined.
    pub fn genesis(timestamp: f64) -> Self {
        Self::candidate(0, Vec::new(), timestamp, constants::GENESIS_PREV_HASH)
    }

    pub fn is_sealed(&self) -> bool {
        self.hash.is_some()
    }

    /// Digest over every field except `hash`.
    pub fn digest(&self) -> String {
        hash::digest(self)
    }

    pub fn seal(mut self, seal: Seal) -> Self {
        self.nonce = seal.nonce;
        self.hash = Some(seal.hash);
        self
    }

    pub fn hash_str(&self) -> &str {
        self.hash.as_deref().unwrap_or_default()
    }
}

/// Wire format of a whole chain, as served on `GET /chain`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainDump {
    pub length: usize,
    pub chain: Vec<Block>,
    #[serde(default)]
    pub peers: Vec<String>,
}

impl ChainDump {
    pub fn new(chain: Vec<Block>, peers: Vec<String>) -> Self {
        Self {
            length: chain.len(),
            chain,
            peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_transaction_requires_author_and_content() {
        let missing_author = NewTransaction {
            content: Some("hello".into()),
            ..Default::default()
        };
        assert!(matches!(
            missing_author.into_transaction(1.0),
            Err(LedgerError::MalformedInput(_))
        ));

        let empty_content = NewTransaction {
            author: Some("a".into()),
            content: Some(String::new()),
            ..Default::default()
        };
        assert!(empty_content.into_transaction(1.0).is_err());
    }

    #[test]
    fn new_transaction_keeps_extra_fields_and_overrides_timestamp() {
        let json = r#"{"author":"a","content":"hello","tag":"x","score":3,"timestamp":5}"#;
        let incoming: NewTransaction = serde_json::from_str(json).unwrap();
        let tx = incoming.into_transaction(1_700_000_000.5).unwrap();
        assert_eq!(tx.author, "a");
        assert_eq!(tx.timestamp, 1_700_000_000.5);
        assert_eq!(tx.extra.get("tag"), Some(&Value::from("x")));
        assert_eq!(tx.extra.get("score"), Some(&Value::from(3)));
        assert!(!tx.extra.contains_key("timestamp"));
    }

    #[test]
    fn transaction_serialization_flattens_extra() {
        let tx = Transaction::new("a", "hello", 1.5).with_field("tag", "x");
        let json = serde_json::to_string(&tx).unwrap();
        assert_eq!(
            json,
            r#"{"author":"a","content":"hello","timestamp":1.5,"tag":"x"}"#
        );
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn candidate_block_omits_hash_on_the_wire() {
        let block = Block::candidate(3, vec![], 10.0, "abc");
        let json = serde_json::to_value(&block).unwrap();
        assert!(json.get("hash").is_none());
        assert_eq!(json["prev_hash"], "abc");
        assert!(!block.is_sealed());
    }

    #[test]
    fn block_without_nonce_defaults_to_zero() {
        let json = r#"{"index":1,"transactions":[],"timestamp":2.0,"prev_hash":"00ab","hash":"00cd"}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.nonce, 0);
        assert_eq!(block.hash.as_deref(), Some("00cd"));
    }

    #[test]
    fn genesis_candidate_shape() {
        let genesis = Block::genesis(constants::GENESIS_TIMESTAMP);
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.prev_hash, "0");
        assert!(genesis.transactions.is_empty());
        assert!(genesis.hash.is_none());
    }

    #[test]
    fn chain_dump_length_matches_blocks() {
        let dump = ChainDump::new(vec![Block::genesis(1.0)], vec!["127.0.0.1:8001".into()]);
        assert_eq!(dump.length, 1);
        let json = serde_json::to_string(&dump).unwrap();
        let back: ChainDump = serde_json::from_str(&json).unwrap();
        assert_eq!(back.peers, vec!["127.0.0.1:8001".to_string()]);
    }
}
