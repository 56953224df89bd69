//! v1 (events) app entries: parsing API JSON into verifiable entries.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::appentry::{AppDomain, AppEntry};
use crate::leaf::canonical::SerializableEvent;
use crate::leaf::idtimestamp::split_id_timestamp_hex;
use crate::leaf::{u64_from_string_or_number, CanonicalError};
use crate::massif::EXTRA_BYTES_SIZE;

/// App domain byte for v1 events.
pub const EVENTS_V1_APP_DOMAIN: u8 = 1;

#[derive(Debug, Deserialize)]
struct MerkleLogCommitJson {
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    index: u64,
    #[serde(default)]
    idtimestamp: String,
}

#[derive(Debug, Deserialize)]
struct EventsV1Json {
    #[serde(default)]
    identity: String,
    #[serde(default)]
    origin_tenant: String,
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
    #[serde(default)]
    trails: Vec<String>,
    #[serde(default)]
    merklelog_commit: Option<MerkleLogCommitJson>,
}

/// Derives the extra-bytes for a v1 event from its origin tenant.
///
/// Layout: the domain byte, the origin tenant's 16 UUID bytes, then zero
/// padding to 24 bytes.
///
/// # Errors
///
/// Returns [`CanonicalError::BadUuid`] when the origin tenant does not
/// carry a UUID.
pub fn events_v1_extra_bytes(origin_tenant: &str) -> Result<[u8; EXTRA_BYTES_SIZE], CanonicalError> {
    let uuid_part = origin_tenant.strip_prefix("tenant/").unwrap_or(origin_tenant);
    let origin = Uuid::parse_str(uuid_part)?;
    let mut extra = [0u8; EXTRA_BYTES_SIZE];
    extra[0] = EVENTS_V1_APP_DOMAIN;
    extra[1..17].copy_from_slice(origin.as_bytes());
    Ok(extra)
}

/// Parses one v1 event's API JSON into a verifiable entry.
///
/// `log_tenant` names the log the entry is expected on, `tenant/<uuid>`.
///
/// # Errors
///
/// Returns canonicalization errors for malformed JSON, identities or
/// id-timestamps, and a missing-field error when the event carries no
/// merkle log commit.
pub fn events_v1_entry(event_json: &[u8], log_tenant: &str) -> Result<AppEntry, CanonicalError> {
    let event: EventsV1Json = serde_json::from_slice(event_json)?;
    let commit = event.merklelog_commit.ok_or(CanonicalError::MissingField {
        field: "merklelog_commit",
    })?;
    if commit.idtimestamp.is_empty() {
        return Err(CanonicalError::MissingField {
            field: "idtimestamp",
        });
    }
    let (id_timestamp, _) = split_id_timestamp_hex(&commit.idtimestamp)?;

    let log_uuid_part = log_tenant.strip_prefix("tenant/").unwrap_or(log_tenant);
    let log_id = *Uuid::parse_str(log_uuid_part)?.as_bytes();

    let extra_bytes = events_v1_extra_bytes(&event.origin_tenant)?;
    let serialized = SerializableEvent {
        attributes: event.attributes,
        trails: event.trails,
    }
    .serialize_canonical()?;

    let entry = AppEntry::new(
        event.identity,
        log_id,
        AppDomain::EventsV1,
        Some(extra_bytes),
        Some(id_timestamp),
        serialized,
        commit.index,
    );
    entry.validate()?;
    Ok(entry)
}

/// Parses a v1 events list response (`{"events": [...]}`) into entries
/// sorted ascending by MMR index, which is log append order.
///
/// # Errors
///
/// Fails on the first event that does not parse; the list is all-or-nothing.
pub fn events_v1_entries(
    list_json: &[u8],
    log_tenant: &str,
) -> Result<Vec<AppEntry>, CanonicalError> {
    #[derive(Deserialize)]
    struct EventList {
        #[serde(default)]
        events: Vec<Value>,
    }
    let list: EventList = serde_json::from_slice(list_json)?;
    let mut entries = Vec::with_capacity(list.events.len());
    for event in &list.events {
        entries.push(events_v1_entry(&serde_json::to_vec(event)?, log_tenant)?);
    }
    entries.sort_by_key(AppEntry::mmr_index);
    Ok(entries)
}
