//! Fingerprint (C6): a stable digest over a dump's `(path, length, bytes)`
//! tuples, used to cheaply reject no-op bulk updates.

use blake2::{Blake2b512, Digest};
use std::collections::HashMap;

/// A content digest over a dump map, independent of map iteration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    /// Computes the fingerprint of a dump map (relative path -> bytes).
    pub fn compute(dump: &HashMap<String, Vec<u8>>) -> Self {
        let mut paths: Vec<&String> = dump.keys().collect();
        paths.sort();

        let mut hasher = Blake2b512::new();
        for path in paths {
            let bytes = &dump[path];
            hasher.update(path.as_bytes());
            hasher.update(bytes.len().to_le_bytes());
            hasher.update(bytes);
        }
        Fingerprint(hasher.finalize().to_vec())
    }

    /// Whether this fingerprint equals `other`.
    pub fn equals(&self, other: &Fingerprint) -> bool {
        self == other
    }

    /// Replaces this fingerprint's digest with `other`'s.
    pub fn renew(&mut self, other: Fingerprint) {
        self.0 = other.0;
    }
}
