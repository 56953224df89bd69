//! Merkle Mountain Range address algebra and proof primitives.
//!
//! Everything in this module is pure computation over node positions and
//! 32-byte hashes. No I/O happens here: callers resolve positions to hashes
//! through a [`NodeStore`] (typically a massif context) or pass resolved
//! witness hashes directly.
//!
//! # Addressing
//!
//! Nodes are numbered in append order starting at 0 (the *MMR index*). A
//! *leaf index* counts leaves only. The *height* of a node is the height of
//! the maximal perfect subtree rooted at it; leaves are height 0. For an MMR
//! of `size` nodes, the *peaks* are the roots of the perfect subtrees whose
//! disjoint union covers all `size` nodes, at positions deterministic in
//! `size`.
//!
//! # Hashing
//!
//! Interior nodes combine as `SHA-256(left || right)`. Bagging combines peak
//! hashes right-to-left: the accumulator starts at the rightmost peak and
//! each step computes `SHA-256(accumulator || peak_to_the_left)`. Peak
//! combination is not commutative; both orders are load-bearing.

mod index;
mod proof;

pub use index::{index_height, leaf_count, mmr_index, peaks, sibling_offset};
pub use proof::{
    bag_peaks, consistency_path, inclusion_path, verify_consistency, verify_consistency_witness,
    verify_inclusion, verify_inclusion_witness, MmrError, NodeStore, PeakExpectation,
};

#[cfg(test)]
mod tests;
