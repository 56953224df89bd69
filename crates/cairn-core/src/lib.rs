//! # cairn-core
//!
//! Client-side verification core for an append-only, tenant-partitioned
//! transparency log built on a Merkle Mountain Range. The log operator
//! stores committed leaves in fixed-size massif blobs; this crate answers,
//! with cryptographic certainty and from those blobs alone:
//!
//! - **Inclusion**: is a given application entry present at the claimed
//!   position in the log?
//! - **Completeness**: is an ordered list of entries complete over the leaf
//!   range it spans, or are positions omitted or excluded?
//! - **Consistency**: has the log grown only by append between two observed
//!   states?
//! - **Attestation**: was a given log state actually signed by the log
//!   operator?
//!
//! The verifier never mutates the log and never trusts leaf bytes it did
//! not re-derive from the application payload. Verification runs against a
//! snapshot; storage is consumed through a single async fetch capability.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cairn_core::config::VerifyConfig;
//! use cairn_core::entry::events_v1_entry;
//! use cairn_core::massif::InMemoryMassifStore;
//! use cairn_core::proof::ProofEngine;
//!
//! # async fn verify(event_json: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryMassifStore::new();
//! let config = VerifyConfig::default();
//! let entry = events_v1_entry(event_json, "tenant/7e4a511f-d4ae-425c-b915-9c4ac09ca929")?;
//!
//! let mut engine = ProofEngine::new(&storage, &config);
//! let included = engine.verify_entry(&entry).await?;
//! # let _ = included;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod entry;
pub mod leaf;
pub mod massif;
pub mod mmr;
pub mod proof;
pub mod reconcile;
pub mod seal;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::VerifyConfig;
    pub use crate::entry::{AppDomain, AppEntry};
    pub use crate::massif::{InMemoryMassifStore, MassifStorage, MassifWindow};
    pub use crate::proof::ProofEngine;
    pub use crate::reconcile::verify_list;
    pub use crate::seal::{LogState, SignedLogState};
}

pub use config::VerifyConfig;
pub use entry::AppEntry;
pub use proof::ProofEngine;
pub use reconcile::verify_list;
