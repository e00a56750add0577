//! Order-stable passage deduplication.

use std::collections::HashSet;

use lectern_core::types::Passage;

/// Merges the combined fan-out output into a duplicate-free list.
///
/// Two passages collide iff their content text and metadata are both equal
/// (fingerprint equality, see [`Passage::fingerprint`]). The first
/// occurrence wins, so for deterministic per-query results the merged batch
/// output is deterministic as well.
pub struct PassageDeduplicator;

impl PassageDeduplicator {
    /// Remove duplicates, preserving first-seen order.
    pub fn dedupe(passages: Vec<Passage>) -> Vec<Passage> {
        let mut seen: HashSet<u64> = HashSet::with_capacity(passages.len());
        let mut unique = Vec::with_capacity(passages.len());

        for passage in passages {
            if seen.insert(passage.fingerprint()) {
                unique.push(passage);
            }
        }

        unique
    }
}
