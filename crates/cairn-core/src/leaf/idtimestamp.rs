//! Id-timestamp parsing and formatting.
//!
//! An id-timestamp is an 8-byte monotonic identifier assigned by the log
//! when a leaf commits. The textual form is 18 hex characters, optionally
//! `0x`-prefixed: the leading two characters carry the commitment epoch and
//! the remaining sixteen the identifier itself. Both prefixed and bare
//! forms are accepted.

use super::CanonicalError;

/// Hex length of the textual form without a prefix.
const HEX_LEN: usize = 18;

/// Splits a textual id-timestamp into `(id, commitment_epoch)`.
///
/// # Errors
///
/// Returns [`CanonicalError::BadIdTimestamp`] for wrong lengths or non-hex
/// content.
pub fn split_id_timestamp_hex(text: &str) -> Result<(u64, u8), CanonicalError> {
    let bad = || CanonicalError::BadIdTimestamp {
        text: text.to_string(),
    };
    let hex_part = text.strip_prefix("0x").unwrap_or(text);
    if hex_part.len() != HEX_LEN {
        return Err(bad());
    }
    let epoch = u8::from_str_radix(&hex_part[..2], 16).map_err(|_| bad())?;
    let id = u64::from_str_radix(&hex_part[2..], 16).map_err(|_| bad())?;
    Ok((id, epoch))
}

/// Renders an id-timestamp in the prefixed textual form.
#[must_use]
pub fn id_timestamp_to_hex(id: u64, commitment_epoch: u8) -> String {
    format!("0x{commitment_epoch:02x}{id:016x}")
}

/// Big-endian wire bytes of an id-timestamp, as mixed into the MMR salt and
/// stored in the trie index.
#[must_use]
pub fn id_timestamp_bytes(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}
