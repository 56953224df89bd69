//! Proof generation and checking against attested log state.

use thiserror::Error;
use tracing::debug;

use crate::config::VerifyConfig;
use crate::entry::AppEntry;
use crate::leaf::CanonicalError;
use crate::massif::{MassifError, MassifStorage, MassifWindow};
use crate::mmr::{
    bag_peaks, consistency_path, inclusion_path, verify_consistency_witness,
    verify_inclusion_witness, MmrError,
};

/// Errors surfaced while producing or checking proofs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProofError {
    /// Address algebra failure.
    #[error(transparent)]
    Mmr(#[from] MmrError),

    /// Massif resolution or storage failure.
    #[error(transparent)]
    Massif(#[from] MassifError),

    /// The entry's payload could not be canonicalized.
    #[error(transparent)]
    Canonical(#[from] CanonicalError),
}

/// An inclusion proof for a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionProof {
    /// MMR index of the proven entry.
    pub mmr_index: u64,

    /// MMR size the proof addresses; the witness chains up to a peak of
    /// this size.
    pub mmr_size: u64,

    /// Sibling hashes from the entry's node up to its peak.
    pub witness: Vec<[u8; 32]>,
}

/// A consistency proof between two log sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyProof {
    /// The older, smaller size.
    pub size_a: u64,

    /// The newer size the old peaks are proven into.
    pub size_b: u64,

    /// Concatenated per-old-peak witnesses, in old-peak order.
    pub witness: Vec<[u8; 32]>,
}

/// Composes the massif window, canonicalizers and address algebra into
/// end-to-end proof operations for one tenant log snapshot.
pub struct ProofEngine<'a> {
    window: MassifWindow<'a>,
}

impl<'a> ProofEngine<'a> {
    /// Creates an engine over `storage` with the call's configuration.
    #[must_use]
    pub fn new(storage: &'a dyn MassifStorage, config: &'a VerifyConfig) -> Self {
        Self {
            window: MassifWindow::new(storage, config),
        }
    }

    /// The massif window backing this engine.
    pub fn window(&mut self) -> &mut MassifWindow<'a> {
        &mut self.window
    }

    fn config(&self) -> &VerifyConfig {
        self.window.config()
    }

    /// Tenant identity to verify `entry` against: the configured override,
    /// or the tenant derived from the entry's log id.
    #[must_use]
    pub fn tenant_for(&self, entry: &AppEntry) -> String {
        self.config()
            .tenant_id
            .clone()
            .unwrap_or_else(|| entry.log_tenant())
    }

    /// Re-derives the committed leaf hash of `entry`, resolving missing
    /// salt material from the trie index of the containing massif.
    ///
    /// # Errors
    ///
    /// Canonicalization failures and massif fetch errors.
    pub async fn entry_leaf_hash(&mut self, entry: &AppEntry) -> Result<[u8; 32], ProofError> {
        if entry.has_salt_material() {
            return Ok(entry.leaf_hash()?);
        }
        let tenant = self.tenant_for(entry);
        let trie_entry = self
            .window
            .trie_entry_at(&tenant, entry.mmr_index())
            .await?;
        let mut resolved = entry.clone();
        resolved.fill_from_trie_entry(&trie_entry);
        Ok(resolved.leaf_hash()?)
    }

    /// Produces the inclusion proof for `entry`.
    ///
    /// The proof addresses the attested size when the config carries one,
    /// so the witness chains up to an attested peak; otherwise it addresses
    /// the range covered by the entry's own massif.
    ///
    /// # Errors
    ///
    /// `NotLeaf` for interior claimed positions (unless suppressed in
    /// config), range errors, and massif fetch errors.
    pub async fn prove_inclusion(&mut self, entry: &AppEntry) -> Result<InclusionProof, ProofError> {
        let tenant = self.tenant_for(entry);
        let mmr_index = entry.mmr_index();
        let massif_range = self
            .window
            .context_for(&tenant, mmr_index)
            .await?
            .range_count();
        let mmr_size = self.config().attested_size.unwrap_or(massif_range);
        let path = inclusion_path(mmr_size, mmr_index)?;
        let mut witness = Vec::with_capacity(path.len());
        for p in path {
            witness.push(self.window.node_at(&tenant, p).await?);
        }
        Ok(InclusionProof {
            mmr_index,
            mmr_size,
            witness,
        })
    }

    /// Checks an inclusion proof for `entry`.
    ///
    /// The implied peak is compared against the configured attestation:
    /// `attested_peaks` when set, else a bag against `attested_root`, else
    /// peaks recomputed from the blob window at the proof's size.
    ///
    /// # Errors
    ///
    /// Range, canonicalization and fetch errors; a hash mismatch returns
    /// `Ok(false)`.
    pub async fn verify_inclusion(
        &mut self,
        entry: &AppEntry,
        proof: &InclusionProof,
    ) -> Result<bool, ProofError> {
        let leaf_hash = self.entry_leaf_hash(entry).await?;
        self.verify_leaf_inclusion(entry, &leaf_hash, proof).await
    }

    /// Checks an inclusion proof for an already-derived leaf hash.
    ///
    /// # Errors
    ///
    /// As [`ProofEngine::verify_inclusion`].
    pub async fn verify_leaf_inclusion(
        &mut self,
        entry: &AppEntry,
        leaf_hash: &[u8; 32],
        proof: &InclusionProof,
    ) -> Result<bool, ProofError> {
        let tenant = self.tenant_for(entry);
        if let Some(peaks) = self.config().attested_peaks.clone() {
            return Ok(verify_inclusion_witness(
                proof.mmr_size,
                leaf_hash,
                proof.mmr_index,
                &proof.witness,
                &peaks,
            )?);
        }
        if let Some(root) = self.config().attested_root {
            // The witness must chain to the stored peak, and the stored
            // peak set must bag to the attested root.
            let peak_hashes = self.window.peak_hashes(&tenant, proof.mmr_size).await?;
            let ok = verify_inclusion_witness(
                proof.mmr_size,
                leaf_hash,
                proof.mmr_index,
                &proof.witness,
                &peak_hashes,
            )?;
            return Ok(ok && bag_peaks(&peak_hashes) == Some(root));
        }
        let peaks = self.window.peak_hashes(&tenant, proof.mmr_size).await?;
        Ok(verify_inclusion_witness(
            proof.mmr_size,
            leaf_hash,
            proof.mmr_index,
            &proof.witness,
            &peaks,
        )?)
    }

    /// Proves and verifies `entry` in one call.
    ///
    /// # Errors
    ///
    /// As [`ProofEngine::prove_inclusion`] and
    /// [`ProofEngine::verify_inclusion`].
    pub async fn verify_entry(&mut self, entry: &AppEntry) -> Result<bool, ProofError> {
        entry.validate()?;
        debug!(mmr_index = entry.mmr_index(), "verifying entry inclusion");
        let proof = self.prove_inclusion(entry).await?;
        self.verify_inclusion(entry, &proof).await
    }

    /// Produces a consistency proof showing the tree of `size_a` nodes is a
    /// prefix of the tree of `size_b` nodes.
    ///
    /// # Errors
    ///
    /// A reversed range, size validation failures, and fetch errors.
    pub async fn prove_consistency(
        &mut self,
        tenant: &str,
        size_a: u64,
        size_b: u64,
    ) -> Result<ConsistencyProof, ProofError> {
        let path = consistency_path(size_a, size_b)?;
        let mut witness = Vec::with_capacity(path.len());
        for p in path {
            witness.push(self.window.node_at(tenant, p).await?);
        }
        Ok(ConsistencyProof {
            size_a,
            size_b,
            witness,
        })
    }

    /// Checks that `peaks_a` (the attested peaks of the older state) remain
    /// in place within the tree whose attested peaks are `peaks_b`.
    ///
    /// Returns `Ok(false)` for a reversed range or any peak mismatch; both
    /// states attest tampering when this fails.
    ///
    /// # Errors
    ///
    /// Size validation failures only.
    pub fn verify_consistency(
        &self,
        peaks_a: &[[u8; 32]],
        peaks_b: &[[u8; 32]],
        proof: &ConsistencyProof,
    ) -> Result<bool, ProofError> {
        Ok(verify_consistency_witness(
            proof.size_a,
            peaks_a,
            proof.size_b,
            peaks_b,
            &proof.witness,
        )?)
    }

    /// Proves and checks consistency between two attested states in one
    /// call.
    ///
    /// # Errors
    ///
    /// Fetch and size validation errors; mismatches return `Ok(false)`.
    pub async fn verify_consistency_between(
        &mut self,
        tenant: &str,
        size_a: u64,
        peaks_a: &[[u8; 32]],
        size_b: u64,
        peaks_b: &[[u8; 32]],
    ) -> Result<bool, ProofError> {
        if size_b < size_a {
            return Ok(false);
        }
        debug!(size_a, size_b, "verifying log consistency");
        let proof = self.prove_consistency(tenant, size_a, size_b).await?;
        self.verify_consistency(peaks_a, peaks_b, &proof)
    }
}
