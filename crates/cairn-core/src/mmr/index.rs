//! Position arithmetic: heights, leaf counts and peak enumeration.

// The height conversion is bounded by u64::BITS and cannot fire.
#![allow(clippy::missing_panics_doc)]

use super::proof::MmrError;

/// Number of significant bits in `v`.
#[inline]
fn bit_len(v: u64) -> u32 {
    u64::BITS - v.leading_zeros()
}

/// True when the binary representation of `v` is a contiguous run of ones.
///
/// Positions of this form (1-based) are the right-most nodes of perfect
/// subtrees, which is what makes the height walk below terminate.
#[inline]
fn all_ones(v: u64) -> bool {
    v != 0 && v.count_zeros() == v.leading_zeros()
}

/// Returns the height of the node at MMR index `i`. Leaves are height 0.
#[must_use]
pub fn index_height(i: u64) -> u8 {
    // Walk the 1-based position left across the mountains until it lands on
    // an all-ones position, which sits at a known height.
    let mut pos = i + 1;
    while !all_ones(pos) {
        pos -= (1u64 << (bit_len(pos) - 1)) - 1;
    }
    u8::try_from(bit_len(pos) - 1).expect("height of a u64-indexed node fits in u8")
}

/// Returns the number of leaves contained in an MMR of `size` nodes.
///
/// The result is also the peak bitmap of the MMR: each binary digit set in
/// the returned count corresponds to one perfect subtree present in the
/// range. `size` does not need to be a complete MMR size; partial sizes
/// count the leaves of the covered prefix.
#[must_use]
pub fn leaf_count(size: u64) -> u64 {
    if size == 0 {
        return 0;
    }
    let mut remaining = size;
    let mut peak_size = u64::MAX >> size.leading_zeros();
    let mut map = 0u64;
    while peak_size > 0 {
        map <<= 1;
        if remaining >= peak_size {
            remaining -= peak_size;
            map |= 1;
        }
        peak_size >>= 1;
    }
    map
}

/// Maps a leaf ordinal to its MMR index.
#[must_use]
pub fn mmr_index(leaf_index: u64) -> u64 {
    2 * leaf_index - u64::from(leaf_index.count_ones())
}

/// Offset between a node at height `height` and its sibling.
#[inline]
#[must_use]
pub fn sibling_offset(height: u8) -> u64 {
    (2u64 << height) - 1
}

/// Returns the peak positions for an MMR of `size` nodes, strictly
/// increasing (which makes the peak heights strictly decreasing).
///
/// # Errors
///
/// Returns [`MmrError::InvalidSize`] when `size` does not describe a
/// complete MMR, i.e. when the last addition left a parent unwritten.
pub fn peaks(size: u64) -> Result<Vec<u64>, MmrError> {
    if size == 0 {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    let mut remaining = size;
    let mut base = 0u64;
    let mut peak_size = u64::MAX >> size.leading_zeros();
    while peak_size > 0 {
        if remaining >= peak_size {
            base += peak_size;
            remaining -= peak_size;
            found.push(base - 1);
        }
        peak_size >>= 1;
    }
    if remaining != 0 {
        return Err(MmrError::InvalidSize { size });
    }
    Ok(found)
}
