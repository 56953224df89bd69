//! Leaf canonicalization: the pipeline that turns an application payload
//! into the exact bytes the log committed to.
//!
//! Two schemas are supported, selected by the app domain byte (the first
//! byte of the trie extra-bytes) or, when extra-bytes are unavailable, by
//! the massif start-header version:
//!
//! - **v1 events** (app domain 1): a salted leaf,
//!   `SHA-256(0x00 || mmr_salt || serialized_bytes)`, where the salt is the
//!   24 extra-bytes followed by the big-endian id-timestamp, and the
//!   serialized bytes are the length-prefixed canonical JSON of the event's
//!   attributes and trails.
//! - **v0 assets** (app domain 0): the legacy schema,
//!   `SHA-256(0x00 || id_timestamp || simple_hash_v3(event))`, with no salt.
//!
//! Both schemas are bit-exact: any deviation in key order, padding or number
//! formatting produces a leaf that will never verify.

pub mod canonical;
pub mod idtimestamp;
pub mod simplehash;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Domain byte for plain committed leaves. Every application leaf hashes
/// under this prefix; other values are reserved for log-internal entries.
pub const LEAF_TYPE_PLAIN: u8 = 0;

/// Errors produced while canonicalizing application payloads.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CanonicalError {
    /// The payload is not the expected JSON shape.
    #[error("payload is not valid event json: {0}")]
    Json(#[from] serde_json::Error),

    /// A tenant or log identity did not parse as a UUID.
    #[error("bad identity uuid: {0}")]
    BadUuid(#[from] uuid::Error),

    /// An id-timestamp string is malformed.
    #[error("bad idtimestamp {text:?}")]
    BadIdTimestamp {
        /// The rejected textual form.
        text: String,
    },

    /// The extra-bytes name an app domain this verifier does not know.
    #[error("unknown app domain {domain}")]
    UnknownAppDomain {
        /// The rejected domain byte.
        domain: u8,
    },

    /// The massif start header names a log version with no hashing schema.
    #[error("no hashing schema for log version {version}")]
    UnknownLogVersion {
        /// The rejected log version.
        version: u32,
    },

    /// A field required for verification is missing or empty.
    #[error("{field} is required and must be non-empty")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A declared timestamp is not RFC-3339.
    #[error("bad rfc3339 timestamp {text:?}")]
    BadTimestamp {
        /// The rejected timestamp text.
        text: String,
    },
}

/// Deserializes a u64 that legacy peers may transmit as a decimal string
/// because it does not fit in a javascript number.
pub(crate) fn u64_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
    }
}
