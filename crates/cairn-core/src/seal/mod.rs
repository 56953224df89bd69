//! Signed log-state attestations.
//!
//! The log operator periodically seals the log by signing its state:
//! `{version, mmr_size, peaks, commitment_epoch, id_timestamp}`. The
//! envelope is a COSE `Sign1`-shaped CBOR array of protected headers,
//! unprotected headers, payload and signature; the signature is ECDSA over
//! P-256 on the canonical `Sig_structure`.
//!
//! The stored payload omits the peak hashes. That is deliberate: a verifier
//! must recompute the peaks from its own view of the massif blobs and
//! re-insert them before checking the signature. A signature that verifies
//! over the re-sealed payload proves both that the operator signed this
//! state and that the local data reproduces it.

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::massif::{MassifError, MassifWindow};

/// Errors produced while decoding or verifying signed log state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SealError {
    /// The envelope or payload is not the expected CBOR shape.
    #[error("cannot decode signed state: {detail}")]
    Decode {
        /// What failed to decode.
        detail: String,
    },

    /// The signature does not verify under the supplied public key.
    #[error("signed state signature verification failed")]
    SignatureFailed,

    /// Massif access failed while recomputing peaks.
    #[error(transparent)]
    Massif(#[from] MassifError),
}

/// The attested state of a log at sealing time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogState {
    /// Log state record version.
    pub version: u32,

    /// MMR size the seal covers.
    pub mmr_size: u64,

    /// Peak hashes of the sealed tree. Omitted on the wire; reinserted by
    /// the verifier from its local view before signature checking.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peaks: Option<Vec<[u8; 32]>>,

    /// Commitment epoch of the sealing id-timestamp.
    pub commitment_epoch: u32,

    /// Id-timestamp of the last leaf covered by the seal.
    pub id_timestamp: u64,
}

/// A decoded signed-state envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedLogState {
    /// Serialized protected headers, covered by the signature.
    pub protected: Vec<u8>,

    /// Payload bytes; CBOR of [`LogState`].
    pub payload: Vec<u8>,

    /// ECDSA P-256 signature, 64-byte `r || s`.
    pub signature: Vec<u8>,
}

impl SignedLogState {
    /// Decodes an envelope from its CBOR wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Decode`] for malformed envelopes.
    pub fn decode(data: &[u8]) -> Result<Self, SealError> {
        ciborium::de::from_reader(data).map_err(|err| SealError::Decode {
            detail: err.to_string(),
        })
    }

    /// Encodes the envelope to its CBOR wire form.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Decode`] if serialization fails, which only
    /// happens on allocation failure.
    pub fn encode(&self) -> Result<Vec<u8>, SealError> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out).map_err(|err| SealError::Decode {
            detail: err.to_string(),
        })?;
        Ok(out)
    }

    /// Decodes the payload into the unsigned log state.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Decode`] when the payload is not a log state.
    pub fn log_state(&self) -> Result<LogState, SealError> {
        ciborium::de::from_reader(self.payload.as_slice()).map_err(|err| SealError::Decode {
            detail: err.to_string(),
        })
    }

    /// Replaces the payload with a re-encoded log state, typically after
    /// reinserting locally recomputed peaks.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Decode`] if the state fails to serialize.
    pub fn reseal(&mut self, state: &LogState) -> Result<(), SealError> {
        let mut payload = Vec::new();
        ciborium::ser::into_writer(state, &mut payload).map_err(|err| SealError::Decode {
            detail: err.to_string(),
        })?;
        self.payload = payload;
        Ok(())
    }

    /// The byte string the signature covers: the CBOR `Sig_structure`
    /// `["Signature1", protected, external_aad, payload]` with empty
    /// external data.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::Decode`] if the structure fails to serialize.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, SealError> {
        #[derive(Serialize)]
        struct SigStructure<'a>(&'a str, &'a [u8], &'a [u8], &'a [u8]);
        let structure = SigStructure("Signature1", &self.protected, &[], &self.payload);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&structure, &mut out).map_err(|err| SealError::Decode {
            detail: err.to_string(),
        })?;
        Ok(out)
    }

    /// Verifies the envelope signature under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::SignatureFailed`] for a bad signature and
    /// [`SealError::Decode`] for a malformed signature field.
    pub fn verify_signature(&self, key: &VerifyingKey) -> Result<(), SealError> {
        let signature =
            Signature::from_slice(&self.signature).map_err(|_| SealError::Decode {
                detail: "signature is not 64 bytes of r||s".to_string(),
            })?;
        let message = self.signed_bytes()?;
        key.verify(&message, &signature)
            .map_err(|_| SealError::SignatureFailed)
    }
}

/// Unwraps a signed state fetched for a tenant: decodes the payload,
/// recomputes the peak hashes from the local blob window at the attested
/// size, reinserts them, and re-seals the envelope for signature checking.
///
/// Returns the re-sealed envelope and the completed log state. The caller
/// verifies the signature with [`SignedLogState::verify_signature`] and the
/// returned state's peaks are then trustworthy attested peaks for
/// inclusion and consistency checks.
///
/// # Errors
///
/// Envelope decode failures and massif access errors while recomputing
/// peaks.
pub async fn unwrap_signed_state(
    window: &mut MassifWindow<'_>,
    tenant: &str,
    envelope: &[u8],
) -> Result<(SignedLogState, LogState), SealError> {
    let mut signed = SignedLogState::decode(envelope)?;
    let mut state = signed.log_state()?;
    state.peaks = Some(window.peak_hashes(tenant, state.mmr_size).await?);
    signed.reseal(&state)?;
    Ok((signed, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;

    fn sign_state(state: &LogState, key: &SigningKey) -> SignedLogState {
        let mut signed = SignedLogState {
            protected: vec![0xa0],
            payload: Vec::new(),
            signature: Vec::new(),
        };
        signed.reseal(state).unwrap();
        let signature: Signature = key.sign(&signed.signed_bytes().unwrap());
        signed.signature = signature.to_bytes().to_vec();
        signed
    }

    fn sample_state() -> LogState {
        LogState {
            version: 1,
            mmr_size: 11,
            peaks: Some(vec![[1u8; 32], [2u8; 32], [3u8; 32]]),
            commitment_epoch: 1,
            id_timestamp: 0x93bb_7feb_8603_2500,
        }
    }

    #[test]
    fn envelope_round_trips() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let signed = sign_state(&sample_state(), &key);
        let decoded = SignedLogState::decode(&signed.encode().unwrap()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.log_state().unwrap(), sample_state());
    }

    #[test]
    fn signature_verifies_under_signing_key() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let signed = sign_state(&sample_state(), &key);
        signed.verify_signature(key.verifying_key()).unwrap();
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let mut signed = sign_state(&sample_state(), &key);
        signed.payload[0] ^= 0x01;
        assert!(matches!(
            signed.verify_signature(key.verifying_key()),
            Err(SealError::SignatureFailed)
        ));
    }

    #[test]
    fn wrong_key_fails_signature() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let other = SigningKey::random(&mut rand::rngs::OsRng);
        let signed = sign_state(&sample_state(), &key);
        assert!(matches!(
            signed.verify_signature(other.verifying_key()),
            Err(SealError::SignatureFailed)
        ));
    }

    #[test]
    fn peaks_are_stripped_and_resealed() {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let full = sample_state();
        let signed = sign_state(&full, &key);

        // The wire form drops the peaks, as the operator stores it.
        let mut wire = signed.clone();
        let mut stripped = full.clone();
        stripped.peaks = None;
        wire.reseal(&stripped).unwrap();
        assert!(wire.log_state().unwrap().peaks.is_none());

        // Reinserting the same peaks reproduces the signed payload exactly.
        wire.reseal(&full).unwrap();
        assert_eq!(wire.payload, signed.payload);
        wire.verify_signature(key.verifying_key()).unwrap();
    }

    #[test]
    fn garbage_envelope_is_a_decode_error() {
        assert!(matches!(
            SignedLogState::decode(b"not cbor at all"),
            Err(SealError::Decode { .. })
        ));
    }
}
