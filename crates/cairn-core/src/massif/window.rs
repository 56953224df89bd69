//! Massif selection, caching and auto-advance.

// The cache-lookup expect follows an insert of the same key.
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;

use tracing::debug;

use super::context::MassifContext;
use super::format::{massif_index_for_node, require_leaf};
use super::storage::MassifStorage;
use super::MassifError;
use crate::config::VerifyConfig;
use crate::mmr::peaks;

/// Resolves MMR indices to massif contexts over a storage backend.
///
/// The window owns a small map of loaded massifs per verification call.
/// Whenever a requested index falls outside the loaded massif, the window
/// transparently fetches the containing one; once loaded, a massif stays
/// available for the rest of the call. Not shareable across tasks - each
/// verification owns its window.
pub struct MassifWindow<'a> {
    storage: &'a dyn MassifStorage,
    config: &'a VerifyConfig,
    massifs: HashMap<(String, u64), MassifContext>,
}

impl<'a> MassifWindow<'a> {
    /// Creates a window over `storage` with the call's configuration.
    #[must_use]
    pub fn new(storage: &'a dyn MassifStorage, config: &'a VerifyConfig) -> Self {
        Self {
            storage,
            config,
            massifs: HashMap::new(),
        }
    }

    /// The configuration this window was created with.
    #[must_use]
    pub fn config(&self) -> &VerifyConfig {
        self.config
    }

    /// Returns the context for `massif_index`, fetching the blob if it is
    /// not already loaded.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` / `Timeout` / parse errors from the fetch.
    pub async fn massif(
        &mut self,
        tenant: &str,
        massif_index: u64,
    ) -> Result<&MassifContext, MassifError> {
        let key = (tenant.to_string(), massif_index);
        if !self.massifs.contains_key(&key) {
            debug!(tenant, massif_index, "fetching massif blob");
            let fetch = self.storage.get_massif(tenant, massif_index);
            let blob = tokio::time::timeout(self.config.deadline, fetch)
                .await
                .map_err(|_| MassifError::Timeout {
                    tenant: tenant.to_string(),
                    massif_index,
                })?
                .map_err(|err| match err {
                    super::StorageError::NotFound {
                        tenant,
                        massif_index,
                    } => MassifError::NotFound {
                        tenant,
                        massif_index,
                    },
                    other => MassifError::Storage(other),
                })?;
            let context = MassifContext::parse(tenant, massif_index, blob)?;
            self.massifs.insert(key.clone(), context);
        }
        Ok(self.massifs.get(&key).expect("massif inserted above"))
    }

    /// Returns the context containing the node at `mmr_index`, honouring the
    /// leaf-only contract: interior positions are rejected with `NotLeaf`
    /// unless the config sets `allow_non_leaf`.
    ///
    /// # Errors
    ///
    /// `NotLeaf` for interior positions without suppression, otherwise as
    /// [`MassifWindow::massif`].
    pub async fn context_for(
        &mut self,
        tenant: &str,
        mmr_index: u64,
    ) -> Result<&MassifContext, MassifError> {
        if !self.config.allow_non_leaf {
            require_leaf(mmr_index)?;
        }
        let massif_index = massif_index_for_node(self.config.massif_height, mmr_index);
        self.massif(tenant, massif_index).await
    }

    /// Reads the node value at `mmr_index`, auto-advancing across massifs.
    /// Interior nodes are always readable here; the leaf-only contract
    /// applies to entry resolution, not raw node access.
    ///
    /// # Errors
    ///
    /// Fetch and range errors as for [`MassifWindow::massif`].
    pub async fn node_at(&mut self, tenant: &str, mmr_index: u64) -> Result<[u8; 32], MassifError> {
        let massif_index = massif_index_for_node(self.config.massif_height, mmr_index);
        self.massif(tenant, massif_index).await?.node(mmr_index)
    }

    /// Reads the trie entry for the leaf at `mmr_index`.
    ///
    /// # Errors
    ///
    /// `NotLeaf` for interior positions; otherwise fetch and range errors.
    pub async fn trie_entry_at(
        &mut self,
        tenant: &str,
        mmr_index: u64,
    ) -> Result<[u8; 32], MassifError> {
        require_leaf(mmr_index)?;
        let massif_index = massif_index_for_node(self.config.massif_height, mmr_index);
        self.massif(tenant, massif_index)
            .await?
            .trie_entry(mmr_index)
    }

    /// Resolves the peak hashes for an MMR of `size` nodes, reading each
    /// peak from its containing massif.
    ///
    /// # Errors
    ///
    /// Size-validation errors from the algebra and fetch errors from
    /// storage.
    pub async fn peak_hashes(
        &mut self,
        tenant: &str,
        size: u64,
    ) -> Result<Vec<[u8; 32]>, MassifError> {
        let positions = peaks(size)?;
        let mut hashes = Vec::with_capacity(positions.len());
        for p in positions {
            hashes.push(self.node_at(tenant, p).await?);
        }
        Ok(hashes)
    }
}
