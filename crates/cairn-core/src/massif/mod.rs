//! Massif blobs: format, parsing, storage access and the blob window.
//!
//! A *massif* is a fixed-capacity contiguous slab of MMR nodes stored as one
//! opaque blob per (tenant, massif index). The layout is:
//!
//! ```text
//! +------------------+-------------------+----------------------+
//! |  start header    |  trie index       |  node array          |
//! |  (32 bytes)      |  (32 B per leaf)  |  (32 B per node)     |
//! +------------------+-------------------+----------------------+
//! ```
//!
//! The verifier consumes massifs read-only. [`MassifContext`] owns a blob's
//! bytes and hands out borrowed 32-byte views; [`MassifWindow`] resolves MMR
//! indices to the right massif, fetching and caching blobs through the
//! [`MassifStorage`] capability. The window is the only place in a
//! verification call that performs I/O.

mod builder;
mod context;
mod format;
mod storage;
mod window;

pub use builder::MassifLogBuilder;
pub use context::MassifContext;
pub use format::{
    first_index_of_massif, leaves_per_massif, massif_index_for_leaf, massif_index_for_node,
    node_capacity_of_massif, MassifStart, EXTRA_BYTES_SIZE, ID_TIMESTAMP_SIZE,
    MAX_START_HEADER_VERSION, NODE_SIZE, START_HEADER_SIZE, TRIE_ENTRY_SIZE,
};
pub use storage::{BoxFuture, InMemoryMassifStore, MassifStorage, StorageError};
pub use window::MassifWindow;


use thiserror::Error;

use crate::mmr::MmrError;

/// Errors surfaced by massif parsing, storage and the window.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MassifError {
    /// The blob does not exist in storage.
    #[error("massif {massif_index} not found for {tenant}")]
    NotFound {
        /// Tenant identity the blob was requested for.
        tenant: String,
        /// Massif index of the missing blob.
        massif_index: u64,
    },

    /// The blob is shorter than its declared regions or misaligned.
    #[error("massif {massif_index} blob is truncated: {detail}")]
    Truncated {
        /// Massif index of the damaged blob.
        massif_index: u64,
        /// What was found short or misaligned.
        detail: String,
    },

    /// The start header is malformed or carries an unknown version.
    #[error("bad massif start header: {detail}")]
    BadHeader {
        /// Why the header was rejected.
        detail: String,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A storage fetch exceeded the configured deadline.
    #[error("fetching massif {massif_index} for {tenant} timed out")]
    Timeout {
        /// Tenant identity the fetch was for.
        tenant: String,
        /// Massif index of the fetch.
        massif_index: u64,
    },

    /// An address-algebra failure, including `NotLeaf` when an interior
    /// position reaches an operation that requires a leaf.
    #[error(transparent)]
    Mmr(#[from] MmrError),
}
