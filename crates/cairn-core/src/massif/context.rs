//! A parsed massif blob with random access to nodes and trie entries.

// Region offsets are validated once at parse time; the conversions and
// expects on the read paths cannot fire after that. usize/u64 casts are
// lossless for blob-sized values.
#![allow(clippy::missing_panics_doc, clippy::cast_possible_truncation)]

use super::format::{
    require_leaf, MassifStart, EXTRA_BYTES_SIZE, NODE_SIZE, START_HEADER_SIZE, TRIE_ENTRY_SIZE,
};
use super::MassifError;
use crate::mmr::{leaf_count, mmr_index, MmrError, NodeStore};

/// Read-only view over one massif blob.
///
/// The context owns the blob's byte buffer for the duration of the
/// verification call; node and trie reads index into it directly. All
/// addressing is in global MMR indices.
#[derive(Debug, Clone)]
pub struct MassifContext {
    tenant: String,
    massif_index: u64,
    start: MassifStart,
    data: Vec<u8>,
}

impl MassifContext {
    /// Parses a fetched blob into a context.
    ///
    /// # Errors
    ///
    /// Returns [`MassifError::Truncated`] when the blob is shorter than its
    /// fixed regions or the node region is not 32-byte aligned, and header
    /// errors from [`MassifStart::parse`].
    pub fn parse(tenant: &str, massif_index: u64, data: Vec<u8>) -> Result<Self, MassifError> {
        let start = MassifStart::parse(massif_index, &data)?;
        let trie_len = usize::try_from(start.leaf_capacity()).expect("leaf capacity fits usize")
            * TRIE_ENTRY_SIZE;
        let fixed = START_HEADER_SIZE + trie_len;
        if data.len() < fixed {
            return Err(MassifError::Truncated {
                massif_index,
                detail: format!(
                    "{} byte blob is smaller than the {fixed} byte header and trie index",
                    data.len()
                ),
            });
        }
        if (data.len() - fixed) % NODE_SIZE != 0 {
            return Err(MassifError::Truncated {
                massif_index,
                detail: "node region is not 32-byte aligned".to_string(),
            });
        }
        Ok(Self {
            tenant: tenant.to_string(),
            massif_index,
            start,
            data,
        })
    }

    /// The tenant this massif belongs to.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// The massif's index within the tenant's log.
    #[must_use]
    pub fn massif_index(&self) -> u64 {
        self.massif_index
    }

    /// The parsed start header.
    #[must_use]
    pub fn start(&self) -> &MassifStart {
        &self.start
    }

    fn node_region_offset(&self) -> usize {
        START_HEADER_SIZE
            + usize::try_from(self.start.leaf_capacity()).expect("leaf capacity fits usize")
                * TRIE_ENTRY_SIZE
    }

    /// Number of node values currently stored in this blob.
    #[must_use]
    pub fn stored_node_count(&self) -> u64 {
        ((self.data.len() - self.node_region_offset()) / NODE_SIZE) as u64
    }

    /// Number of MMR nodes represented by this massif and all massifs before
    /// it; the MMR size up to and including this massif's content.
    #[must_use]
    pub fn range_count(&self) -> u64 {
        self.start.first_index + self.stored_node_count()
    }

    /// Leaf ordinal of this massif's first leaf.
    #[must_use]
    pub fn first_leaf_index(&self) -> u64 {
        self.massif_index * self.start.leaf_capacity()
    }

    /// Number of leaves currently committed to this massif.
    #[must_use]
    pub fn stored_leaf_count(&self) -> u64 {
        leaf_count(self.range_count()) - self.first_leaf_index()
    }

    /// MMR index of the last leaf currently stored in this massif. Interior
    /// nodes above it may still follow in the node array.
    #[must_use]
    pub fn last_leaf_mmr_index(&self) -> u64 {
        let stored = self.stored_leaf_count();
        if stored == 0 {
            return self.start.first_index;
        }
        mmr_index(self.first_leaf_index() + stored - 1)
    }

    /// True when `i` falls inside this massif's node range (stored or not).
    #[must_use]
    pub fn contains(&self, i: u64) -> bool {
        i >= self.start.first_index && i < self.range_count()
    }

    /// Returns the 32-byte node value at MMR index `i`.
    ///
    /// Interior nodes are readable like leaves; the verification walk needs
    /// both.
    ///
    /// # Errors
    ///
    /// Returns an out-of-range error when `i` is not stored in this massif.
    pub fn node(&self, i: u64) -> Result<[u8; 32], MassifError> {
        if !self.contains(i) {
            return Err(MassifError::Mmr(MmrError::OutOfRange {
                index: i,
                size: self.range_count(),
            }));
        }
        let slot = usize::try_from(i - self.start.first_index).expect("massif offset fits usize");
        let offset = self.node_region_offset() + slot * NODE_SIZE;
        let mut out = [0u8; NODE_SIZE];
        out.copy_from_slice(&self.data[offset..offset + NODE_SIZE]);
        Ok(out)
    }

    /// Returns the 32-byte trie entry (24 extra-bytes then the big-endian
    /// id-timestamp) for the leaf at MMR index `i`.
    ///
    /// # Errors
    ///
    /// Returns `NotLeaf` for interior positions and an out-of-range error
    /// for leaves outside this massif.
    pub fn trie_entry(&self, i: u64) -> Result<[u8; TRIE_ENTRY_SIZE], MassifError> {
        require_leaf(i)?;
        let leaf_index = leaf_count(i + 1) - 1;
        let first = self.first_leaf_index();
        if leaf_index < first || leaf_index >= first + self.start.leaf_capacity() {
            return Err(MassifError::Mmr(MmrError::OutOfRange {
                index: i,
                size: self.range_count(),
            }));
        }
        let slot = usize::try_from(leaf_index - first).expect("trie slot fits usize");
        let offset = START_HEADER_SIZE + slot * TRIE_ENTRY_SIZE;
        let mut out = [0u8; TRIE_ENTRY_SIZE];
        out.copy_from_slice(&self.data[offset..offset + TRIE_ENTRY_SIZE]);
        Ok(out)
    }

    /// Extra-bytes portion of the trie entry for the leaf at `i`.
    ///
    /// # Errors
    ///
    /// As [`MassifContext::trie_entry`].
    pub fn trie_extra_bytes(&self, i: u64) -> Result<[u8; EXTRA_BYTES_SIZE], MassifError> {
        let entry = self.trie_entry(i)?;
        let mut out = [0u8; EXTRA_BYTES_SIZE];
        out.copy_from_slice(&entry[..EXTRA_BYTES_SIZE]);
        Ok(out)
    }

    /// Id-timestamp portion of the trie entry for the leaf at `i`.
    ///
    /// # Errors
    ///
    /// As [`MassifContext::trie_entry`].
    pub fn trie_id_timestamp(&self, i: u64) -> Result<u64, MassifError> {
        let entry = self.trie_entry(i)?;
        Ok(u64::from_be_bytes(
            entry[EXTRA_BYTES_SIZE..].try_into().expect("8-byte slice"),
        ))
    }
}

impl NodeStore for MassifContext {
    fn node(&self, i: u64) -> Result<[u8; 32], MmrError> {
        MassifContext::node(self, i).map_err(|_| MmrError::MissingNode { index: i })
    }
}
