//! The proof engine: inclusion and consistency verification composed from
//! the address algebra, the massif window and the canonicalizers.

mod engine;

pub use engine::{ConsistencyProof, InclusionProof, ProofEngine, ProofError};
