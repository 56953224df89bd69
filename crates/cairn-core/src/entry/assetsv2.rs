//! v0 (assets) app entries: the backwards-compatible log version 0 schema.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::appentry::{AppDomain, AppEntry};
use crate::leaf::idtimestamp::split_id_timestamp_hex;
use crate::leaf::simplehash::V3Event;
use crate::leaf::CanonicalError;
use crate::massif::EXTRA_BYTES_SIZE;

/// App domain byte for v0 assets events.
pub const ASSETS_V2_APP_DOMAIN: u8 = 0;

/// Parses one v0 event's API JSON into a verifiable entry.
///
/// The serialized bytes of a v0 entry are the event JSON itself; the
/// hashing schema folds its own field serialization into the digest, so no
/// separate canonical rendering exists for this domain.
///
/// # Errors
///
/// Returns canonicalization errors for malformed JSON and missing-field
/// errors for the identity, tenant, commit or id-timestamp.
pub fn assets_v2_entry(event_json: &[u8]) -> Result<AppEntry, CanonicalError> {
    let event = V3Event::from_json(event_json)?;
    if event.identity.is_empty() {
        return Err(CanonicalError::MissingField { field: "identity" });
    }
    if event.tenant_identity.is_empty() {
        return Err(CanonicalError::MissingField {
            field: "tenant_identity",
        });
    }
    let commit = event.commit()?;
    if commit.idtimestamp.is_empty() {
        return Err(CanonicalError::MissingField {
            field: "idtimestamp",
        });
    }
    let (id_timestamp, _) = split_id_timestamp_hex(&commit.idtimestamp)?;

    let uuid_part = event
        .tenant_identity
        .strip_prefix("tenant/")
        .unwrap_or(&event.tenant_identity);
    let log_id = *Uuid::parse_str(uuid_part)?.as_bytes();

    // v0 leaves carry no salt; the trie extra-bytes for this domain are the
    // zero-filled record led by the domain byte.
    let extra_bytes = [0u8; EXTRA_BYTES_SIZE];

    Ok(AppEntry::new(
        event.identity.clone(),
        log_id,
        AppDomain::AssetsV2,
        Some(extra_bytes),
        Some(id_timestamp),
        event_json.to_vec(),
        commit.index,
    ))
}

/// Parses a v0 events list response (`{"events": [...]}`) into entries
/// sorted ascending by MMR index.
///
/// # Errors
///
/// Fails on the first event that does not parse.
pub fn assets_v2_entries(list_json: &[u8]) -> Result<Vec<AppEntry>, CanonicalError> {
    #[derive(Deserialize)]
    struct EventList {
        #[serde(default)]
        events: Vec<Value>,
    }
    let list: EventList = serde_json::from_slice(list_json)?;
    let mut entries = Vec::with_capacity(list.events.len());
    for event in &list.events {
        entries.push(assets_v2_entry(&serde_json::to_vec(event)?)?);
    }
    entries.sort_by_key(AppEntry::mmr_index);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_json(index: u64, attribute: &str) -> String {
        format!(
            r#"{{
                "identity": "assets/9ccdc19b-44a1-434c-afab-14f8eac3405c/events/82c9f5c2-fe77-4885-86aa-417f654d3b2f",
                "asset_identity": "assets/9ccdc19b-44a1-434c-afab-14f8eac3405c",
                "event_attributes": {{"step": "{attribute}"}},
                "asset_attributes": {{}},
                "operation": "Record",
                "behaviour": "RecordEvidence",
                "timestamp_declared": "2024-01-24T11:42:16Z",
                "timestamp_accepted": "2024-01-24T11:42:16Z",
                "timestamp_committed": "2024-01-24T11:42:17.121Z",
                "from": "0xc98130dc7b292FB485F842785f6F63A520a404A5",
                "tenant_identity": "tenant/15c551cf-40ed-4cdb-a94b-142d6e3c620a",
                "merklelog_entry": {{
                    "commit": {{
                        "index": {index},
                        "idtimestamp": "0x018d3b472e22146400"
                    }}
                }}
            }}"#
        )
    }

    #[test]
    fn parses_committed_event() {
        let entry = assets_v2_entry(event_json(53, "mix").as_bytes()).unwrap();
        assert_eq!(entry.app_domain(), AppDomain::AssetsV2);
        assert_eq!(entry.mmr_index(), 53);
        assert_eq!(entry.id_timestamp(), Some(0x8d3b_472e_2214_6400));
        assert_eq!(
            entry.log_tenant(),
            "tenant/15c551cf-40ed-4cdb-a94b-142d6e3c620a"
        );
    }

    #[test]
    fn leaf_hash_tracks_payload_content() {
        let a = assets_v2_entry(event_json(53, "mix").as_bytes()).unwrap();
        let b = assets_v2_entry(event_json(53, "stir").as_bytes()).unwrap();
        assert_ne!(a.leaf_hash().unwrap(), b.leaf_hash().unwrap());
    }

    #[test]
    fn rejects_missing_tenant() {
        let json = event_json(53, "mix").replace(
            r#""tenant_identity": "tenant/15c551cf-40ed-4cdb-a94b-142d6e3c620a","#,
            "",
        );
        assert!(matches!(
            assets_v2_entry(json.as_bytes()),
            Err(CanonicalError::MissingField { .. })
        ));
    }

    #[test]
    fn list_parse_sorts_by_mmr_index() {
        let list = format!(
            "{{\"events\": [{}, {}]}}",
            event_json(10, "later"),
            event_json(4, "earlier")
        );
        let entries = assets_v2_entries(list.as_bytes()).unwrap();
        assert_eq!(entries[0].mmr_index(), 4);
        assert_eq!(entries[1].mmr_index(), 10);
    }
}
