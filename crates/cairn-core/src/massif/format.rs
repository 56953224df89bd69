//! Bit-exact massif blob layout: start header and region addressing.

// Slice-to-array conversions below operate on ranges already bounds-checked
// against the header, so the expects cannot fire.
#![allow(clippy::missing_panics_doc)]

use super::MassifError;
use crate::mmr::{index_height, leaf_count, mmr_index, MmrError};

/// Size of the fixed start header at the front of every massif blob.
pub const START_HEADER_SIZE: usize = 32;

/// Highest start-header version this verifier understands. Version 0 logs
/// commit v0 (assets) leaves; version 1 logs commit salted v1 leaves.
pub const MAX_START_HEADER_VERSION: u32 = 1;

/// Size of one trie-index entry: 24 extra-bytes then an 8-byte id-timestamp.
pub const TRIE_ENTRY_SIZE: usize = 32;

/// Extra-bytes portion of a trie entry.
pub const EXTRA_BYTES_SIZE: usize = 24;

/// Id-timestamp portion of a trie entry, big-endian.
pub const ID_TIMESTAMP_SIZE: usize = 8;

/// Size of one stored MMR node value.
pub const NODE_SIZE: usize = 32;

/// Number of leaves a massif of `height` holds.
#[inline]
#[must_use]
pub fn leaves_per_massif(height: u8) -> u64 {
    1u64 << (height - 1)
}

/// Massif index of the massif holding leaf ordinal `leaf_index`.
#[inline]
#[must_use]
pub fn massif_index_for_leaf(height: u8, leaf_index: u64) -> u64 {
    leaf_index / leaves_per_massif(height)
}

/// Massif index of the massif storing the node at `mmr_index`.
///
/// Interior nodes are stored with the massif of their last descendant leaf,
/// which is where they complete. Callers enforcing the leaf-only contract
/// should check [`index_height`] first; this function accepts any node.
#[must_use]
pub fn massif_index_for_node(height: u8, mmr_index: u64) -> u64 {
    let last_leaf_below = leaf_count(mmr_index + 1) - 1;
    massif_index_for_leaf(height, last_leaf_below)
}

/// MMR index of the first node stored in massif `massif_index`.
#[must_use]
pub fn first_index_of_massif(height: u8, massif_index: u64) -> u64 {
    mmr_index(massif_index * leaves_per_massif(height))
}

/// Number of node slots massif `massif_index` holds when full, including
/// the ancestor nodes that complete inside it.
#[must_use]
pub fn node_capacity_of_massif(height: u8, massif_index: u64) -> u64 {
    first_index_of_massif(height, massif_index + 1) - first_index_of_massif(height, massif_index)
}

/// Parsed start header of a massif blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MassifStart {
    /// Log version; selects the leaf hashing schema when extra-bytes are
    /// not available.
    pub version: u32,

    /// Commitment epoch the massif's id-timestamps belong to.
    pub commitment_epoch: u32,

    /// MMR index of the first node stored in this massif.
    pub first_index: u64,

    /// Massif height; fixes the leaf capacity as `2^(height-1)`.
    pub massif_height: u8,
}

impl MassifStart {
    /// Parses the 32-byte start header from the front of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`MassifError::Truncated`] when fewer than
    /// [`START_HEADER_SIZE`] bytes are present, and [`MassifError::BadHeader`]
    /// for unknown versions, a zero height, or a first index that is not a
    /// massif boundary for the declared height.
    pub fn parse(massif_index: u64, data: &[u8]) -> Result<Self, MassifError> {
        let Some(header) = data.get(..START_HEADER_SIZE) else {
            return Err(MassifError::Truncated {
                massif_index,
                detail: format!("{} byte blob is smaller than the start header", data.len()),
            });
        };
        let version = u32::from_be_bytes(header[0..4].try_into().expect("4-byte slice"));
        if version > MAX_START_HEADER_VERSION {
            return Err(MassifError::BadHeader {
                detail: format!("unknown start header version {version}"),
            });
        }
        let commitment_epoch = u32::from_be_bytes(header[4..8].try_into().expect("4-byte slice"));
        let first_index = u64::from_be_bytes(header[8..16].try_into().expect("8-byte slice"));
        let massif_height = header[16];
        if massif_height == 0 {
            return Err(MassifError::BadHeader {
                detail: "zero massif height".to_string(),
            });
        }
        if first_index != first_index_of_massif(massif_height, massif_index) {
            return Err(MassifError::BadHeader {
                detail: format!(
                    "first index {first_index} does not start massif {massif_index} at height {massif_height}"
                ),
            });
        }
        Ok(Self {
            version,
            commitment_epoch,
            first_index,
            massif_height,
        })
    }

    /// Encodes the header into its 32-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; START_HEADER_SIZE] {
        let mut out = [0u8; START_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.version.to_be_bytes());
        out[4..8].copy_from_slice(&self.commitment_epoch.to_be_bytes());
        out[8..16].copy_from_slice(&self.first_index.to_be_bytes());
        out[16] = self.massif_height;
        out
    }

    /// Leaf capacity of a massif with this header.
    #[must_use]
    pub fn leaf_capacity(&self) -> u64 {
        leaves_per_massif(self.massif_height)
    }
}

/// Checks that `mmr_index` addresses a leaf, for operations restricted to
/// leaf positions.
pub(crate) fn require_leaf(mmr_index: u64) -> Result<(), MmrError> {
    if index_height(mmr_index) != 0 {
        return Err(MmrError::NotLeaf { index: mmr_index });
    }
    Ok(())
}
