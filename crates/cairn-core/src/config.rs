//! Verification configuration.
//!
//! The configuration is a plain record passed by reference into the massif
//! window and proof engine. Every knob has a conservative default; an
//! all-default config verifies against peaks recomputed from the fetched
//! blobs, which proves internal integrity but not operator attestation. Set
//! [`VerifyConfig::attested_peaks`] or [`VerifyConfig::attested_root`] from
//! a verified signed log state to anchor verification to an attestation.

use std::time::Duration;

/// Massif height used by production logs: `2^13` leaves per massif blob.
pub const DEFAULT_MASSIF_HEIGHT: u8 = 14;

/// Default budget for a single massif blob fetch.
pub const DEFAULT_FETCH_DEADLINE: Duration = Duration::from_secs(30);

/// Options controlling a verification call.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Log tenant to verify against, overriding the tenant derived from the
    /// entry's log id. `tenant/<uuid>` form.
    pub tenant_id: Option<String>,

    /// Height of the massifs holding this log.
    pub massif_height: u8,

    /// Suppress `NotLeaf` errors when resolving the containing massif of an
    /// interior node position, for callers probing ranges by node index
    /// rather than leaf index.
    pub allow_non_leaf: bool,

    /// Deadline applied to every storage fetch. Elapse aborts the
    /// verification with a timeout error.
    pub deadline: Duration,

    /// MMR size of the attested log state. When set, inclusion proofs are
    /// generated and checked at this size instead of the entry massif's
    /// range count, so the witness chains to the attested peak set.
    pub attested_size: Option<u64>,

    /// Attested peak hashes from a verified log state. When set, inclusion
    /// proofs are checked against these instead of peaks recomputed from
    /// the blob window.
    pub attested_peaks: Option<Vec<[u8; 32]>>,

    /// Attested bagged root. Only consulted when `attested_peaks` is unset.
    pub attested_root: Option<[u8; 32]>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            massif_height: DEFAULT_MASSIF_HEIGHT,
            allow_non_leaf: false,
            deadline: DEFAULT_FETCH_DEADLINE,
            attested_size: None,
            attested_peaks: None,
            attested_root: None,
        }
    }
}

impl VerifyConfig {
    /// Config for a massif height other than the production default.
    #[must_use]
    pub fn with_massif_height(massif_height: u8) -> Self {
        Self {
            massif_height,
            ..Self::default()
        }
    }
}
