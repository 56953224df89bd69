//! Shared fixtures: a deterministic tenant-log generator over the in-memory
//! store, and a seal signer producing operator-style signed states.

use cairn_core::entry::{events_v1_entry, AppEntry};
use cairn_core::leaf::idtimestamp::id_timestamp_to_hex;
use cairn_core::massif::{InMemoryMassifStore, MassifLogBuilder};
use cairn_core::mmr::mmr_index;
use cairn_core::seal::{LogState, SignedLogState};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};

pub const LOG_TENANT: &str = "tenant/7e4a511f-d4ae-425c-b915-9c4ac09ca929";
pub const TEST_MASSIF_HEIGHT: u8 = 3;

/// Deterministic v1 event JSON for leaf `sequence` committed at `mmr_idx`.
pub fn test_event_json(sequence: u64, mmr_idx: u64, step: &str) -> String {
    let idtimestamp = id_timestamp_to_hex(0x0190_0000_0000_0000 + sequence, 1);
    format!(
        r#"{{
            "identity": "events/0193bb7f-e975-7007-95ad-4691e2b9c1{sequence:02x}",
            "attributes": {{
                "sequence": "{sequence}",
                "step": "{step}"
            }},
            "trails": ["cake"],
            "origin_tenant": "{LOG_TENANT}",
            "merklelog_commit": {{
                "index": "{mmr_idx}",
                "idtimestamp": "{idtimestamp}"
            }}
        }}"#
    )
}

/// A built tenant log: the store serving its massifs, the verifiable
/// entries, and the raw builder for direct node access.
pub struct TenantLog {
    pub store: InMemoryMassifStore,
    pub entries: Vec<AppEntry>,
    pub builder: MassifLogBuilder,
}

impl TenantLog {
    /// Appends `additional` more leaves to the same log, refreshing the
    /// stored blobs in place, the way the operator extends a live log.
    pub fn extend(&mut self, additional: u64) {
        let have = self.builder.leaf_count();
        for l in have..have + additional {
            let json = test_event_json(l, mmr_index(l), "mix until gloopy");
            let entry = events_v1_entry(json.as_bytes(), LOG_TENANT).unwrap();
            self.builder.add_hashed_leaf(
                entry.leaf_hash().unwrap(),
                *entry.extra_bytes().unwrap(),
                entry.id_timestamp().unwrap(),
            );
            self.entries.push(entry);
        }
        self.builder.populate_store(&self.store, LOG_TENANT);
    }
}

/// Builds a v1 tenant log of `leaves` events at the test massif height.
pub fn build_tenant_log(leaves: u64) -> TenantLog {
    let mut log = TenantLog {
        store: InMemoryMassifStore::new(),
        entries: Vec::new(),
        builder: MassifLogBuilder::new(1, 1, TEST_MASSIF_HEIGHT),
    };
    log.extend(leaves);
    log
}

/// Signs a log state the way the operator's sealer does: peaks included in
/// the signed payload, stripped from the returned wire envelope.
pub fn sign_log_state(state: &LogState, key: &SigningKey) -> Vec<u8> {
    let mut signed = SignedLogState {
        protected: vec![0xa0],
        payload: Vec::new(),
        signature: Vec::new(),
    };
    signed.reseal(state).unwrap();
    let signature: Signature = key.sign(&signed.signed_bytes().unwrap());
    signed.signature = signature.to_bytes().to_vec();

    // The stored form omits the peaks; verifiers recompute them.
    let mut stripped = state.clone();
    stripped.peaks = None;
    signed.reseal(&stripped).unwrap();
    signed.encode().unwrap()
}
