//! The verifiable app entry and its leaf-hash derivation.

// The trie-entry suffix conversion is a fixed 8-byte slice.
#![allow(clippy::missing_panics_doc)]

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::leaf::simplehash::{simple_hash_v3, V3Event};
use crate::leaf::{CanonicalError, LEAF_TYPE_PLAIN};
use crate::massif::{EXTRA_BYTES_SIZE, TRIE_ENTRY_SIZE};

/// Size of the MMR salt mixed into every v1 leaf.
pub const MMR_SALT_SIZE: usize = 32;

/// Application domain of a committed entry, named by the first byte of its
/// extra-bytes. The domain selects the leaf hashing schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppDomain {
    /// Legacy assets events, log version 0. Unsalted `simple_hash_v3`
    /// leaves.
    AssetsV2,

    /// Events, log version 1. Salted canonical-serialization leaves.
    EventsV1,
}

impl AppDomain {
    /// The domain byte stored at the front of the extra-bytes.
    #[must_use]
    pub fn byte(self) -> u8 {
        match self {
            Self::AssetsV2 => 0,
            Self::EventsV1 => 1,
        }
    }

    /// Resolves a domain byte.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::UnknownAppDomain`] for bytes with no
    /// registered schema.
    pub fn from_byte(domain: u8) -> Result<Self, CanonicalError> {
        match domain {
            0 => Ok(Self::AssetsV2),
            1 => Ok(Self::EventsV1),
            other => Err(CanonicalError::UnknownAppDomain { domain: other }),
        }
    }

    /// Selects the hashing schema from a massif start-header version, for
    /// entries whose extra-bytes are not yet available.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::UnknownLogVersion`] for versions with no
    /// schema.
    pub fn from_log_version(version: u32) -> Result<Self, CanonicalError> {
        match version {
            0 => Ok(Self::AssetsV2),
            1 => Ok(Self::EventsV1),
            other => Err(CanonicalError::UnknownLogVersion { version: other }),
        }
    }
}

/// Packs app-scoped material into the fixed 24-byte extra-bytes field.
///
/// The domain byte leads; material longer than the remaining 23 bytes is
/// truncated, shorter material is right-padded with zeros.
#[must_use]
pub fn pack_extra_bytes(domain: u8, material: &[u8]) -> [u8; EXTRA_BYTES_SIZE] {
    let mut out = [0u8; EXTRA_BYTES_SIZE];
    out[0] = domain;
    let take = material.len().min(EXTRA_BYTES_SIZE - 1);
    out[1..=take].copy_from_slice(&material[..take]);
    out
}

/// The app-provided data for one committed log entry.
///
/// Extra-bytes and the id-timestamp participate in the v1 salt; when the
/// caller cannot supply them they are resolved from the trie index of the
/// containing massif before hashing.
#[derive(Debug, Clone)]
pub struct AppEntry {
    app_id: String,
    log_id: [u8; 16],
    app_domain: AppDomain,
    extra_bytes: Option<[u8; EXTRA_BYTES_SIZE]>,
    id_timestamp: Option<u64>,
    serialized_bytes: Vec<u8>,
    mmr_index: u64,
}

impl AppEntry {
    /// Creates an entry from already-derived parts.
    #[must_use]
    pub fn new(
        app_id: String,
        log_id: [u8; 16],
        app_domain: AppDomain,
        extra_bytes: Option<[u8; EXTRA_BYTES_SIZE]>,
        id_timestamp: Option<u64>,
        serialized_bytes: Vec<u8>,
        mmr_index: u64,
    ) -> Self {
        Self {
            app_id,
            log_id,
            app_domain,
            extra_bytes,
            id_timestamp,
            serialized_bytes,
            mmr_index,
        }
    }

    /// Identifier of the app object this entry commits.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The 16 raw UUID bytes identifying the log.
    #[must_use]
    pub fn log_id(&self) -> &[u8; 16] {
        &self.log_id
    }

    /// The entry's application domain.
    #[must_use]
    pub fn app_domain(&self) -> AppDomain {
        self.app_domain
    }

    /// MMR index the entry claims to be committed at.
    #[must_use]
    pub fn mmr_index(&self) -> u64 {
        self.mmr_index
    }

    /// The entry's extra-bytes, when known.
    #[must_use]
    pub fn extra_bytes(&self) -> Option<&[u8; EXTRA_BYTES_SIZE]> {
        self.extra_bytes.as_ref()
    }

    /// The entry's id-timestamp, when known.
    #[must_use]
    pub fn id_timestamp(&self) -> Option<u64> {
        self.id_timestamp
    }

    /// The canonical application payload bytes.
    #[must_use]
    pub fn serialized_bytes(&self) -> &[u8] {
        &self.serialized_bytes
    }

    /// Tenant identity of the log this entry belongs to, `tenant/<uuid>`.
    #[must_use]
    pub fn log_tenant(&self) -> String {
        format!("tenant/{}", Uuid::from_bytes(self.log_id))
    }

    /// True when the salt material is already present and hashing needs no
    /// trie lookup.
    #[must_use]
    pub fn has_salt_material(&self) -> bool {
        self.extra_bytes.is_some() && self.id_timestamp.is_some()
    }

    /// Fills missing salt material from a trie entry read off the log.
    pub fn fill_from_trie_entry(&mut self, trie_entry: &[u8; TRIE_ENTRY_SIZE]) {
        if self.extra_bytes.is_none() {
            let mut extra = [0u8; EXTRA_BYTES_SIZE];
            extra.copy_from_slice(&trie_entry[..EXTRA_BYTES_SIZE]);
            self.extra_bytes = Some(extra);
        }
        if self.id_timestamp.is_none() {
            self.id_timestamp = Some(u64::from_be_bytes(
                trie_entry[EXTRA_BYTES_SIZE..].try_into().expect("8-byte slice"),
            ));
        }
    }

    /// Derives the 32-byte MMR salt: extra-bytes followed by the big-endian
    /// id-timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::MissingField`] when either component is
    /// unknown.
    pub fn mmr_salt(&self) -> Result<[u8; MMR_SALT_SIZE], CanonicalError> {
        let extra = self.extra_bytes.ok_or(CanonicalError::MissingField {
            field: "extra_bytes",
        })?;
        let id_timestamp = self.id_timestamp.ok_or(CanonicalError::MissingField {
            field: "idtimestamp",
        })?;
        let mut salt = [0u8; MMR_SALT_SIZE];
        salt[..EXTRA_BYTES_SIZE].copy_from_slice(&extra);
        salt[EXTRA_BYTES_SIZE..].copy_from_slice(&id_timestamp.to_be_bytes());
        Ok(salt)
    }

    /// Re-derives the leaf hash the log committed for this entry.
    ///
    /// # Errors
    ///
    /// Returns canonicalization errors: missing salt material for v1
    /// entries, payload parse failures for v0 entries.
    pub fn leaf_hash(&self) -> Result<[u8; 32], CanonicalError> {
        match self.app_domain {
            AppDomain::EventsV1 => {
                let mut hasher = Sha256::new();
                hasher.update([LEAF_TYPE_PLAIN]);
                hasher.update(self.mmr_salt()?);
                hasher.update(&self.serialized_bytes);
                Ok(hasher.finalize().into())
            }
            AppDomain::AssetsV2 => {
                let event = V3Event::from_json(&self.serialized_bytes)?;
                let id_timestamp = self.id_timestamp.ok_or(CanonicalError::MissingField {
                    field: "idtimestamp",
                })?;
                let inner = simple_hash_v3(&event)?;
                let mut hasher = Sha256::new();
                hasher.update([LEAF_TYPE_PLAIN]);
                hasher.update(id_timestamp.to_be_bytes());
                hasher.update(inner);
                Ok(hasher.finalize().into())
            }
        }
    }

    /// Checks the fields verification cannot proceed without.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::MissingField`] naming the first absent
    /// field.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.app_id.is_empty() {
            return Err(CanonicalError::MissingField { field: "identity" });
        }
        if self.serialized_bytes.is_empty() {
            return Err(CanonicalError::MissingField {
                field: "serialized payload",
            });
        }
        Ok(())
    }
}
