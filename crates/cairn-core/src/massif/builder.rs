//! Fixture-side massif construction.
//!
//! Verification never writes to the log; this builder exists so tests and
//! local tooling can materialise massif blobs that the verifier then reads.
//! It keeps the whole node array in memory and slices it into per-massif
//! blobs on demand.

// Node ordinals of in-memory fixture logs always fit usize.
#![allow(clippy::missing_panics_doc, clippy::cast_possible_truncation)]

use sha2::{Digest, Sha256};

use super::format::{
    first_index_of_massif, leaves_per_massif, MassifStart, EXTRA_BYTES_SIZE, NODE_SIZE,
    START_HEADER_SIZE, TRIE_ENTRY_SIZE,
};
use super::storage::InMemoryMassifStore;
use crate::mmr::{index_height, sibling_offset};

/// Builds a tenant log leaf by leaf and emits massif blobs.
#[derive(Debug, Clone)]
pub struct MassifLogBuilder {
    version: u32,
    commitment_epoch: u32,
    massif_height: u8,
    nodes: Vec<[u8; 32]>,
    trie: Vec<[u8; TRIE_ENTRY_SIZE]>,
}

impl MassifLogBuilder {
    /// Creates a builder for a log of `version` with massifs of
    /// `massif_height`.
    #[must_use]
    pub fn new(version: u32, commitment_epoch: u32, massif_height: u8) -> Self {
        Self {
            version,
            commitment_epoch,
            massif_height,
            nodes: Vec::new(),
            trie: Vec::new(),
        }
    }

    /// Appends an already-hashed leaf together with its trie metadata.
    /// Interior nodes that complete with this leaf are appended too.
    ///
    /// Returns the MMR index the leaf landed on.
    pub fn add_hashed_leaf(
        &mut self,
        leaf_hash: [u8; 32],
        extra_bytes: [u8; EXTRA_BYTES_SIZE],
        id_timestamp: u64,
    ) -> u64 {
        let leaf_index = self.nodes.len() as u64;
        self.nodes.push(leaf_hash);

        let mut entry = [0u8; TRIE_ENTRY_SIZE];
        entry[..EXTRA_BYTES_SIZE].copy_from_slice(&extra_bytes);
        entry[EXTRA_BYTES_SIZE..].copy_from_slice(&id_timestamp.to_be_bytes());
        self.trie.push(entry);

        loop {
            let next = self.nodes.len() as u64;
            let height = index_height(next);
            if height == 0 {
                break;
            }
            let right = self.nodes[self.nodes.len() - 1];
            let left_index = next - 1 - sibling_offset(height - 1);
            let left = self.nodes[usize::try_from(left_index).expect("node index fits usize")];
            let mut hasher = Sha256::new();
            hasher.update(left);
            hasher.update(right);
            self.nodes.push(hasher.finalize().into());
        }
        leaf_index
    }

    /// Current MMR size of the built log.
    #[must_use]
    pub fn mmr_size(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// Number of leaves appended so far.
    #[must_use]
    pub fn leaf_count(&self) -> u64 {
        self.trie.len() as u64
    }

    /// The full node array, usable directly as a `NodeStore` in tests.
    #[must_use]
    pub fn nodes(&self) -> &[[u8; 32]] {
        &self.nodes
    }

    /// Number of massif blobs the current log occupies.
    #[must_use]
    pub fn massif_count(&self) -> u64 {
        let per_massif = leaves_per_massif(self.massif_height);
        self.leaf_count().div_ceil(per_massif)
    }

    /// Emits the blob for massif `massif_index` in wire layout.
    ///
    /// # Panics
    ///
    /// Panics when `massif_index` is beyond the built log; fixture misuse,
    /// not a runtime condition.
    #[must_use]
    pub fn massif_blob(&self, massif_index: u64) -> Vec<u8> {
        assert!(
            massif_index < self.massif_count(),
            "massif {massif_index} has no leaves yet"
        );
        let per_massif = leaves_per_massif(self.massif_height);
        let first_leaf = usize::try_from(massif_index * per_massif).expect("leaf ordinal");
        let first_index = first_index_of_massif(self.massif_height, massif_index);
        let end_index = first_index_of_massif(self.massif_height, massif_index + 1)
            .min(self.mmr_size());

        let start = MassifStart {
            version: self.version,
            commitment_epoch: self.commitment_epoch,
            first_index,
            massif_height: self.massif_height,
        };

        let trie_slots = usize::try_from(per_massif).expect("leaf capacity fits usize");
        let node_count = usize::try_from(end_index - first_index).expect("node count fits usize");
        let mut blob = Vec::with_capacity(
            START_HEADER_SIZE + trie_slots * TRIE_ENTRY_SIZE + node_count * NODE_SIZE,
        );
        blob.extend_from_slice(&start.encode());
        for slot in 0..trie_slots {
            match self.trie.get(first_leaf + slot) {
                Some(entry) => blob.extend_from_slice(entry),
                None => blob.extend_from_slice(&[0u8; TRIE_ENTRY_SIZE]),
            }
        }
        let node_start = usize::try_from(first_index).expect("node index fits usize");
        for node in &self.nodes[node_start..node_start + node_count] {
            blob.extend_from_slice(node);
        }
        blob
    }

    /// Writes every built massif blob into `store` under `tenant`.
    pub fn populate_store(&self, store: &InMemoryMassifStore, tenant: &str) {
        for m in 0..self.massif_count() {
            store.put(tenant, m, self.massif_blob(m));
        }
    }
}
