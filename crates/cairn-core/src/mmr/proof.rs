//! Inclusion and consistency paths, witness walking and peak bagging.

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::index::{index_height, peaks, sibling_offset};

/// Errors produced by the MMR address algebra.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MmrError {
    /// An operation that requires a leaf position was given an interior node.
    #[error("mmr index {index} is an interior node, not a leaf")]
    NotLeaf {
        /// The offending MMR index.
        index: u64,
    },

    /// The node count does not describe a complete MMR.
    #[error("{size} is not a valid mmr size")]
    InvalidSize {
        /// The offending node count.
        size: u64,
    },

    /// A position lies beyond the addressed range.
    #[error("mmr index {index} is out of range for size {size}")]
    OutOfRange {
        /// The requested MMR index.
        index: u64,
        /// The size of the addressed MMR.
        size: u64,
    },

    /// A node value could not be resolved by the backing store.
    #[error("node {index} is not available in the backing store")]
    MissingNode {
        /// The unresolvable MMR index.
        index: u64,
    },

    /// A consistency proof was requested from a larger to a smaller tree.
    #[error("consistency range is reversed: {size_a} -> {size_b}")]
    RangeReversed {
        /// The claimed older size.
        size_a: u64,
        /// The claimed newer size.
        size_b: u64,
    },
}

/// Read access to stored node values, addressed by MMR index.
///
/// A massif context is the canonical implementation; tests use plain
/// in-memory node arrays.
pub trait NodeStore {
    /// Returns the 32-byte value of the node at MMR index `i`.
    ///
    /// # Errors
    ///
    /// Returns [`MmrError::MissingNode`] when the index is not covered by
    /// this store.
    fn node(&self, i: u64) -> Result<[u8; 32], MmrError>;
}

impl NodeStore for [[u8; 32]] {
    fn node(&self, i: u64) -> Result<[u8; 32], MmrError> {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.get(i).copied())
            .ok_or(MmrError::MissingNode { index: i })
    }
}

impl NodeStore for Vec<[u8; 32]> {
    fn node(&self, i: u64) -> Result<[u8; 32], MmrError> {
        self.as_slice().node(i)
    }
}

/// The attested log state an inclusion proof is checked against.
#[derive(Debug, Clone, Copy)]
pub enum PeakExpectation<'a> {
    /// The attested peak hashes for the tree of the proven size. The implied
    /// peak produced by the witness walk must match the covering entry.
    Peaks(&'a [[u8; 32]]),

    /// An attested bagged root. Remaining peak hashes are read from the
    /// store, the implied peak is substituted, and the bag is compared.
    Root(&'a [u8; 32]),
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Bags peak hashes into a single root.
///
/// The accumulator starts at the rightmost peak; each step combines
/// `H(accumulator || peak_to_the_left)`. Returns `None` for an empty peak
/// set.
#[must_use]
pub fn bag_peaks(peak_hashes: &[[u8; 32]]) -> Option<[u8; 32]> {
    let (last, rest) = peak_hashes.split_last()?;
    let mut root = *last;
    for peak in rest.iter().rev() {
        root = hash_pair(&root, peak);
    }
    Some(root)
}

/// Returns the sibling positions that chain the node at `i` up to its peak
/// in an MMR of `size` nodes.
///
/// The last addressable index is derived internally as `size - 1`; callers
/// never pass a last-index. The target may be an interior node, which is how
/// consistency proofs reuse this walk.
///
/// # Errors
///
/// Returns [`MmrError::OutOfRange`] when `i >= size`.
pub fn inclusion_path(size: u64, i: u64) -> Result<Vec<u64>, MmrError> {
    if i >= size {
        return Err(MmrError::OutOfRange { index: i, size });
    }
    let last = size - 1;
    let mut path = Vec::new();
    let mut pos = i;
    loop {
        let height = index_height(pos);
        if index_height(pos + 1) > height {
            // pos is a right child; the sibling sits to its left and the
            // parent immediately after pos.
            path.push(pos - sibling_offset(height));
            pos += 1;
        } else {
            let sibling = pos + sibling_offset(height);
            if sibling > last {
                break;
            }
            path.push(sibling);
            pos = sibling + 1;
        }
        if pos > last {
            break;
        }
    }
    Ok(path)
}

/// Walks a witness from `pos`, combining sibling hashes according to the
/// address algebra. Returns the accumulated hash and final position, or
/// `None` if the walk escapes the addressed range.
fn walk_witness(
    size: u64,
    mut pos: u64,
    start: &[u8; 32],
    witness: &[[u8; 32]],
) -> Option<([u8; 32], u64)> {
    let mut acc = *start;
    for sibling in witness {
        if pos >= size {
            return None;
        }
        let height = index_height(pos);
        if index_height(pos + 1) > height {
            acc = hash_pair(sibling, &acc);
            pos += 1;
        } else {
            acc = hash_pair(&acc, sibling);
            pos += sibling_offset(height) + 1;
        }
    }
    if pos >= size {
        return None;
    }
    Some((acc, pos))
}

/// Ordinal of the peak whose perfect subtree covers position `i`.
fn covering_peak(peak_positions: &[u64], i: u64) -> Option<usize> {
    peak_positions.iter().position(|&p| p >= i)
}

/// Verifies an inclusion witness against an attested peak set.
///
/// `witness` is the resolved hash sequence for the path returned by
/// [`inclusion_path`]. The walk must land exactly on the peak covering `i`,
/// and the accumulated hash must equal the covering entry of
/// `attested_peaks`.
///
/// # Errors
///
/// Returns [`MmrError::OutOfRange`] when `i >= size` and
/// [`MmrError::InvalidSize`] when `size` is not a complete MMR size.
pub fn verify_inclusion_witness(
    size: u64,
    node_hash: &[u8; 32],
    i: u64,
    witness: &[[u8; 32]],
    attested_peaks: &[[u8; 32]],
) -> Result<bool, MmrError> {
    if i >= size {
        return Err(MmrError::OutOfRange { index: i, size });
    }
    let peak_positions = peaks(size)?;
    if attested_peaks.len() != peak_positions.len() {
        return Ok(false);
    }
    let Some(k) = covering_peak(&peak_positions, i) else {
        return Ok(false);
    };
    let Some((implied, end)) = walk_witness(size, i, node_hash, witness) else {
        return Ok(false);
    };
    Ok(end == peak_positions[k] && implied == attested_peaks[k])
}

/// Verifies an inclusion proof, resolving the path through `store`.
///
/// With [`PeakExpectation::Peaks`] the implied peak is matched against the
/// attested set. With [`PeakExpectation::Root`] the remaining peak hashes
/// are read from the store, the implied peak substituted at its ordinal, and
/// the bagged result compared to the attested root.
///
/// # Errors
///
/// Propagates range and store errors; a hash mismatch is `Ok(false)`, never
/// an error.
pub fn verify_inclusion(
    store: &dyn NodeStore,
    size: u64,
    node_hash: &[u8; 32],
    i: u64,
    path: &[u64],
    expectation: PeakExpectation<'_>,
) -> Result<bool, MmrError> {
    let witness = resolve(store, path)?;
    match expectation {
        PeakExpectation::Peaks(attested) => {
            verify_inclusion_witness(size, node_hash, i, &witness, attested)
        }
        PeakExpectation::Root(root) => {
            if i >= size {
                return Err(MmrError::OutOfRange { index: i, size });
            }
            let peak_positions = peaks(size)?;
            let Some(k) = covering_peak(&peak_positions, i) else {
                return Ok(false);
            };
            let Some((implied, end)) = walk_witness(size, i, node_hash, &witness) else {
                return Ok(false);
            };
            if end != peak_positions[k] {
                return Ok(false);
            }
            let mut peak_hashes = resolve(store, &peak_positions)?;
            peak_hashes[k] = implied;
            Ok(bag_peaks(&peak_hashes).as_ref() == Some(root))
        }
    }
}

/// Returns the flat witness positions proving that the tree of `size_a`
/// nodes is a prefix of the tree of `size_b` nodes.
///
/// The path is the concatenation, in old-peak order, of the inclusion path
/// of each old peak within the new tree. Segment boundaries are not encoded;
/// verification re-derives them from the algebra.
///
/// # Errors
///
/// Returns [`MmrError::RangeReversed`] when `size_b < size_a`, and size
/// validation errors for either argument.
pub fn consistency_path(size_a: u64, size_b: u64) -> Result<Vec<u64>, MmrError> {
    if size_b < size_a {
        return Err(MmrError::RangeReversed { size_a, size_b });
    }
    let mut path = Vec::new();
    for p in peaks(size_a)? {
        path.extend(inclusion_path(size_b, p)?);
    }
    Ok(path)
}

/// Verifies a consistency witness: every old peak, hashed with its slice of
/// the witness, must reproduce the attested new peak covering it.
///
/// Returns `Ok(false)` (never panics, never errors) for a reversed range,
/// mismatched peak-list lengths, or any hash mismatch.
///
/// # Errors
///
/// Returns size-validation errors for malformed `size_a` / `size_b`.
pub fn verify_consistency_witness(
    size_a: u64,
    peaks_a: &[[u8; 32]],
    size_b: u64,
    peaks_b: &[[u8; 32]],
    witness: &[[u8; 32]],
) -> Result<bool, MmrError> {
    if size_b < size_a {
        return Ok(false);
    }
    let old_positions = peaks(size_a)?;
    let new_positions = peaks(size_b)?;
    if peaks_a.len() != old_positions.len() || peaks_b.len() != new_positions.len() {
        return Ok(false);
    }
    let mut cursor = 0usize;
    for (k, &p) in old_positions.iter().enumerate() {
        let segment_len = inclusion_path(size_b, p)?.len();
        let Some(segment) = witness.get(cursor..cursor + segment_len) else {
            return Ok(false);
        };
        cursor += segment_len;
        let Some((produced, end)) = walk_witness(size_b, p, &peaks_a[k], segment) else {
            return Ok(false);
        };
        let Some(ordinal) = covering_peak(&new_positions, p) else {
            return Ok(false);
        };
        if end != new_positions[ordinal] || produced != peaks_b[ordinal] {
            return Ok(false);
        }
    }
    Ok(cursor == witness.len())
}

/// Verifies a consistency proof, resolving the flat path through `store`.
///
/// # Errors
///
/// Propagates store and size-validation errors; mismatches are `Ok(false)`.
pub fn verify_consistency(
    store: &dyn NodeStore,
    size_a: u64,
    peaks_a: &[[u8; 32]],
    size_b: u64,
    peaks_b: &[[u8; 32]],
    path: &[u64],
) -> Result<bool, MmrError> {
    if size_b < size_a {
        return Ok(false);
    }
    let witness = resolve(store, path)?;
    verify_consistency_witness(size_a, peaks_a, size_b, peaks_b, &witness)
}

fn resolve(store: &dyn NodeStore, positions: &[u64]) -> Result<Vec<[u8; 32]>, MmrError> {
    positions.iter().map(|&p| store.node(p)).collect()
}
