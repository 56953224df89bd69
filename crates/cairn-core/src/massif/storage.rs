//! The blob storage capability consumed by the verifier.
//!
//! The verifier needs exactly one operation from storage: fetch the blob for
//! a (tenant, massif index) pair. The trait is object-safe and async via a
//! boxed-future return, so callers can back it with a remote blob store
//! without this crate depending on any transport.

// Lock poisoning indicates a panic in another thread, which is
// unrecoverable.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

use thiserror::Error;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by a storage backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// No blob exists for the requested (tenant, massif index).
    #[error("no massif blob {massif_index} for {tenant}")]
    NotFound {
        /// Tenant identity of the request.
        tenant: String,
        /// Massif index of the request.
        massif_index: u64,
    },

    /// The backend failed to serve the request.
    #[error("storage unavailable: {detail}")]
    Unavailable {
        /// Backend-specific failure description.
        detail: String,
    },
}

/// Read capability over massif blobs.
///
/// A fetch of a massif blob must return a byte-identical snapshot. Later
/// fetches may return longer suffixes but must never diverge on any prefix;
/// the log is append-only and the verifier relies on it.
pub trait MassifStorage: Send + Sync {
    /// Fetches the entire blob for `massif_index` of `tenant`.
    ///
    /// `tenant` has the form `tenant/<uuid>`.
    fn get_massif<'a>(
        &'a self,
        tenant: &'a str,
        massif_index: u64,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;
}

/// In-memory storage backend.
///
/// Holds blobs in a map guarded by a read-write lock. Used by the test
/// fixtures and anywhere a verification needs to run against blobs already
/// in hand.
#[derive(Debug, Default)]
pub struct InMemoryMassifStore {
    blobs: RwLock<HashMap<(String, u64), Vec<u8>>>,
}

impl InMemoryMassifStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the blob for `(tenant, massif_index)`.
    pub fn put(&self, tenant: &str, massif_index: u64, blob: Vec<u8>) {
        self.blobs
            .write()
            .expect("massif store lock poisoned")
            .insert((tenant.to_string(), massif_index), blob);
    }
}

impl MassifStorage for InMemoryMassifStore {
    fn get_massif<'a>(
        &'a self,
        tenant: &'a str,
        massif_index: u64,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            self.blobs
                .read()
                .expect("massif store lock poisoned")
                .get(&(tenant.to_string(), massif_index))
                .cloned()
                .ok_or_else(|| StorageError::NotFound {
                    tenant: tenant.to_string(),
                    massif_index,
                })
        })
    }
}
