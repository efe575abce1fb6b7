//! Canonical block encoding and digest.
//!
//! The digest input is the block without its `hash` field, written as compact
//! JSON with object keys sorted at every level. Two blocks with equal field
//! values always hash the same no matter how they were built or decoded.
use crate::Block;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

pub fn canonical_form(block: &Block) -> String {
    let mut fields = Map::new();
    fields.insert("index".into(), Value::from(block.index));
    fields.insert(
        "transactions".into(),
        Value::Array(block.transactions.iter().map(|t| t.to_value()).collect()),
    );
    fields.insert("timestamp".into(), Value::from(block.timestamp));
    fields.insert("prev_hash".into(), Value::from(block.prev_hash.as_str()));
    fields.insert("nonce".into(), Value::from(block.nonce));

    let mut out = String::with_capacity(128);
    write_canonical(&Value::Object(fields), &mut out);
    out
}

/// Lowercase hex SHA-256 of the canonical form.
pub fn digest(block: &Block) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(block).as_bytes());
    hex::encode(hasher.finalize())
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::from(key.as_str()), out);
                out.push(':');
                write_canonical(v, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    // Display on a scalar Value is its compact JSON text
    out.push_str(&value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;
    use crate::Transaction;

    fn sample_block() -> Block {
        let txs = vec![
            Transaction::new("alice", "hello", 1_600_000_000.25),
            Transaction::new("bob", "world", 1_600_000_100.0).with_field("tag", "x"),
        ];
        Block::candidate(1, txs, 1_600_000_200.5, "00ab")
    }

    #[test]
    fn canonical_form_sorts_keys() {
        let block = Block::candidate(1, vec![], 2.5, "0");
        assert_eq!(
            canonical_form(&block),
            r#"{"index":1,"nonce":0,"prev_hash":"0","timestamp":2.5,"transactions":[]}"#
        );
    }

    #[test]
    fn canonical_form_sorts_transaction_keys() {
        let tx = Transaction::new("a", "hello", 3.0).with_field("zeta", 1).with_field("alpha", "v");
        let block = Block::candidate(1, vec![tx], 2.5, "0");
        let form = canonical_form(&block);
        assert!(form.contains(
            r#"[{"alpha":"v","author":"a","content":"hello","timestamp":3.0,"zeta":1}]"#
        ));
    }

    #[test]
    fn digest_is_lowercase_hex_sha256() {
        let d = digest(&sample_block());
        assert_eq!(d.len(), HASH_HEX_SIZE);
        assert!(d.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn digest_is_deterministic() {
        let block = sample_block();
        assert_eq!(digest(&block), digest(&block.clone()));
    }

    #[test]
    fn digest_ignores_field_insertion_order() {
        let a = Transaction::new("a", "hello", 3.0)
            .with_field("x", 1)
            .with_field("y", 2);
        let b = Transaction::new("a", "hello", 3.0)
            .with_field("y", 2)
            .with_field("x", 1);
        let block_a = Block::candidate(1, vec![a], 2.5, "0");
        let block_b = Block::candidate(1, vec![b], 2.5, "0");
        assert_eq!(digest(&block_a), digest(&block_b));

        // and regardless of the key order in decoded JSON
        let json_a = r#"{"index":1,"transactions":[],"timestamp":2.5,"prev_hash":"0","nonce":7}"#;
        let json_b = r#"{"nonce":7,"prev_hash":"0","timestamp":2.5,"transactions":[],"index":1}"#;
        let from_a: Block = serde_json::from_str(json_a).unwrap();
        let from_b: Block = serde_json::from_str(json_b).unwrap();
        assert_eq!(digest(&from_a), digest(&from_b));
    }

    #[test]
    fn digest_excludes_hash_field() {
        let block = sample_block();
        let mut with_hash = block.clone();
        with_hash.hash = Some("ff".repeat(32));
        assert_eq!(digest(&block), digest(&with_hash));
    }

    #[test]
    fn digest_changes_with_nonce() {
        let mut block = sample_block();
        let before = digest(&block);
        block.nonce += 1;
        assert_ne!(before, digest(&block));
    }

    #[test]
    fn digest_survives_json_round_trip() {
        let block = Block::candidate(2, vec![], 1_700_000_123.456_789_1, "00ff");
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(digest(&block), digest(&back));
    }
}
