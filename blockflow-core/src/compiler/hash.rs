//! Content hash of a strategy graph.
//!
//! A 32-bit rolling multiplicative hash (`h = h * 31 + unit`) over the UTF-16
//! code units of a canonical text. Deterministic and cheap, but NOT collision
//! resistant: never use it for security-sensitive deduplication.

use serde::Serialize;

use crate::domain::{Block, BlockId, Connection};

#[derive(Serialize)]
struct HashedBlock<'a> {
    id: &'a BlockId,
    config: &'a std::collections::BTreeMap<String, serde_json::Value>,
}

/// Canonical text: the `(id, config)` pairs in block order followed by the
/// raw connection list in connection order.
///
/// Reordering blocks or connections changes the text, so semantically
/// equivalent graphs can hash differently.
pub fn canonical_text(blocks: &[Block], connections: &[Connection]) -> String {
    let hashed: Vec<HashedBlock<'_>> = blocks
        .iter()
        .map(|b| HashedBlock {
            id: &b.id,
            config: &b.config,
        })
        .collect();
    // Serializing plain maps, strings and ids cannot fail.
    let mut text = serde_json::to_string(&hashed).unwrap_or_default();
    text.push_str(&serde_json::to_string(connections).unwrap_or_default());
    text
}

/// Fold `text` into a 32-bit hash and render its unsigned magnitude as hex.
pub fn rolling_hash(text: &str) -> String {
    let mut h: i32 = 0;
    for unit in text.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    format!("{:x}", h.unsigned_abs())
}

pub fn content_hash(blocks: &[Block], connections: &[Connection]) -> String {
    rolling_hash(&canonical_text(blocks, connections))
}
