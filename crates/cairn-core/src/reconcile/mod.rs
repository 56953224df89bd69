//! The list reconciler: completeness verification of an ordered entry list
//! against a contiguous leaf range of the log.
//!
//! Given entries sorted ascending by MMR index, the reconciler walks every
//! leaf between the first and last entry's leaf positions and classifies
//! each pairing:
//!
//! ```text
//! |----------------------|
//! | entry1 entry2 entry3 |   entry list (lowest mmr index to highest)
//! |----------------------|
//!     v      v      v
//! |----------------------|
//! | leaf1  leaf2  leaf3  |   leaf range from the log
//! |----------------------|
//! ```
//!
//! An entry proven at its leaf is *included*. A leaf with no entry in the
//! list is *omitted* and recorded. An entry that cannot be on the log - an
//! interior-node reference, a duplicate index, payload bytes that do not
//! hash to the leaf, or a failed inclusion proof - is *excluded*, and the
//! walk aborts on the first one: duplicates and interior references mean
//! either tampering or a malformed request, and there is no safe way to
//! continue past them.

use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::debug;

use crate::config::VerifyConfig;
use crate::entry::AppEntry;
use crate::leaf::CanonicalError;
use crate::massif::{MassifError, MassifStorage};
use crate::mmr::{index_height, leaf_count, mmr_index, MmrError};
use crate::proof::{ProofEngine, ProofError};


/// Why a list failed to reconcile against the log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReconcileError {
    /// An entry references an interior node; only leaves commit entries.
    #[error("entry at mmr index {mmr_index} references an interior node")]
    IntermediateNode {
        /// The interior position the entry claimed.
        mmr_index: u64,
    },

    /// An entry repeats the index of an already-consumed leaf.
    #[error("entry mmr index {mmr_index} duplicates an earlier entry")]
    Duplicate {
        /// The repeated position.
        mmr_index: u64,
    },

    /// The entry's payload does not hash to the leaf stored at its claimed
    /// position.
    #[error("entry at mmr index {mmr_index} does not match the leaf on the log")]
    NotOnLeaf {
        /// The claimed position.
        mmr_index: u64,
    },

    /// The leaf matched but its inclusion proof failed against the peaks.
    #[error("entry at mmr index {mmr_index} failed inclusion verification")]
    InclusionFailed {
        /// The claimed position.
        mmr_index: u64,
    },

    /// The entry list ran out while leaves in the range remained.
    #[error("fewer entries than leaves in the verified range")]
    NotEnoughEntries,

    /// Entries remained after every leaf in the range was consumed.
    #[error("more entries than leaves in the verified range")]
    TooManyEntries,

    /// The entry list was empty; there is no range to verify.
    #[error("cannot verify an empty entry list")]
    EmptyList,

    /// Massif resolution or storage failure.
    #[error(transparent)]
    Massif(#[from] MassifError),

    /// Payload canonicalization failure.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    /// Address algebra failure.
    #[error(transparent)]
    Mmr(#[from] MmrError),

    /// Proof engine failure below the classification layer.
    #[error(transparent)]
    Proof(#[from] ProofError),
}

/// Returns the inclusive leaf-index range implied by a sorted entry list.
///
/// # Errors
///
/// Returns [`ReconcileError::EmptyList`] for an empty slice.
pub fn leaf_range(entries: &[AppEntry]) -> Result<(u64, u64), ReconcileError> {
    let first = entries.first().ok_or(ReconcileError::EmptyList)?;
    let last = entries.last().ok_or(ReconcileError::EmptyList)?;
    let low = leaf_count(first.mmr_index() + 1) - 1;
    let high = leaf_count(last.mmr_index() + 1) - 1;
    Ok((low, high))
}

/// Verifies a sorted list of entries against the leaf range they span.
///
/// On success returns the MMR indices of omitted leaves - positions on the
/// log inside the range with no entry in the list. The returned indices are
/// strictly increasing. The first excluded entry aborts the walk with the
/// error classifying it.
///
/// # Errors
///
/// Classification errors as described on [`ReconcileError`], plus massif,
/// canonicalization and storage failures from the layers below.
pub async fn verify_list(
    storage: &dyn MassifStorage,
    config: &VerifyConfig,
    entries: &[AppEntry],
) -> Result<Vec<u64>, ReconcileError> {
    let (low_leaf, high_leaf) = leaf_range(entries)?;
    debug!(low_leaf, high_leaf, entries = entries.len(), "verifying entry list");

    let mut engine = ProofEngine::new(storage, config);
    let mut omitted = Vec::new();
    let mut entry_cursor = 0usize;

    for leaf_index in low_leaf..=high_leaf {
        let Some(entry) = entries.get(entry_cursor) else {
            return Err(ReconcileError::NotEnoughEntries);
        };
        let leaf_mmr_index = mmr_index(leaf_index);

        match check_entry_at(&mut engine, entry, leaf_mmr_index).await? {
            Classification::Omitted => {
                // The entry belongs to a later leaf; the log has a leaf the
                // list does not know about.
                omitted.push(leaf_mmr_index);
            }
            Classification::Included => {
                entry_cursor += 1;
            }
        }
    }

    if entry_cursor != entries.len() {
        return Err(ReconcileError::TooManyEntries);
    }
    Ok(omitted)
}

enum Classification {
    Included,
    Omitted,
}

/// Classifies the next entry against the next leaf in the range. Excluded
/// classifications are returned as errors; only the continuing states come
/// back as values.
async fn check_entry_at(
    engine: &mut ProofEngine<'_>,
    entry: &AppEntry,
    leaf_mmr_index: u64,
) -> Result<Classification, ReconcileError> {
    let entry_mmr_index = entry.mmr_index();

    // Only leaf nodes commit entries; an interior reference can never be on
    // the log, whatever the payload hashes to.
    if index_height(entry_mmr_index) != 0 {
        return Err(ReconcileError::IntermediateNode {
            mmr_index: entry_mmr_index,
        });
    }

    // Behind the walk: the position was already consumed by the previous
    // entry, so this one is either a duplicate or claims a leaf it cannot
    // be on.
    if entry_mmr_index < leaf_mmr_index {
        return Err(ReconcileError::Duplicate {
            mmr_index: entry_mmr_index,
        });
    }

    // Ahead of the walk: the log has a leaf at this position that the list
    // skipped.
    if entry_mmr_index > leaf_mmr_index {
        return Ok(Classification::Omitted);
    }

    let tenant = engine.tenant_for(entry);
    let leaf_hash = engine.entry_leaf_hash(entry).await?;
    let stored = engine
        .window()
        .node_at(&tenant, leaf_mmr_index)
        .await
        .map_err(ProofError::from)?;
    if leaf_hash.ct_eq(&stored).unwrap_u8() == 0 {
        return Err(ReconcileError::NotOnLeaf {
            mmr_index: leaf_mmr_index,
        });
    }

    let proof = engine.prove_inclusion(entry).await?;
    if !engine.verify_leaf_inclusion(entry, &leaf_hash, &proof).await? {
        return Err(ReconcileError::InclusionFailed {
            mmr_index: leaf_mmr_index,
        });
    }
    Ok(Classification::Included)
}
