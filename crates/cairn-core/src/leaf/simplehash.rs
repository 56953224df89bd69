//! The v0 (assets) hashing schema: `simple_hash_v3` over a fixed V3 event
//! record.
//!
//! Every field is absorbed into one SHA-256 state in a fixed order with
//! unambiguous framing: strings are length-prefixed UTF-8, timestamps are
//! normalized to RFC-3339 UTC before framing, principals contribute their
//! four subfields in order, and attribute maps contribute an entry count
//! followed by key/value pairs sorted by key. All length and count prefixes
//! are big-endian u64.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use super::{u64_from_string_or_number, CanonicalError};

/// An actor identity on a v0 event, hashed as its four ordered subfields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Principal {
    /// Issuer of the identity.
    #[serde(default)]
    pub issuer: String,

    /// Subject within the issuer's namespace.
    #[serde(default)]
    pub subject: String,

    /// Human-readable display name.
    #[serde(default)]
    pub display_name: String,

    /// Contact email, possibly empty.
    #[serde(default)]
    pub email: String,
}

/// The log commitment reference carried on a v0 event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MerkleLogCommit {
    /// MMR index the event committed to.
    #[serde(default, deserialize_with = "u64_from_string_or_number")]
    pub index: u64,

    /// Textual id-timestamp assigned at commit time.
    #[serde(default)]
    pub idtimestamp: String,
}

/// The `merklelog_entry` envelope on a v0 event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MerkleLogEntry {
    /// Commit details; absence fails validation before hashing.
    #[serde(default)]
    pub commit: Option<MerkleLogCommit>,
}

/// The fixed v0 (assets) event record, as returned by the events API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct V3Event {
    /// Event identity, `assets/<uuid>/events/<uuid>`.
    #[serde(default)]
    pub identity: String,

    /// Identity of the asset the event belongs to.
    #[serde(default)]
    pub asset_identity: String,

    /// Event-scoped attributes.
    #[serde(default)]
    pub event_attributes: Map<String, Value>,

    /// Asset-scoped attributes as of this event.
    #[serde(default)]
    pub asset_attributes: Map<String, Value>,

    /// Operation name.
    #[serde(default)]
    pub operation: String,

    /// Behaviour the operation belongs to.
    #[serde(default)]
    pub behaviour: String,

    /// Timestamp declared by the submitter.
    #[serde(default)]
    pub timestamp_declared: String,

    /// Timestamp the log operator accepted the event.
    #[serde(default)]
    pub timestamp_accepted: String,

    /// Timestamp the event committed; empty until committed.
    #[serde(default)]
    pub timestamp_committed: String,

    /// Identity declared by the submitter.
    #[serde(default)]
    pub principal_declared: Option<Principal>,

    /// Identity the operator authenticated.
    #[serde(default)]
    pub principal_accepted: Option<Principal>,

    /// Tenant that owns the event.
    #[serde(default)]
    pub tenant_identity: String,

    /// Submitting wallet address.
    #[serde(default)]
    pub from: String,

    /// Log commitment reference.
    #[serde(default)]
    pub merklelog_entry: Option<MerkleLogEntry>,
}

impl V3Event {
    /// Parses a single v0 event from its API JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::Json`] for malformed JSON.
    pub fn from_json(event_json: &[u8]) -> Result<Self, CanonicalError> {
        Ok(serde_json::from_slice(event_json)?)
    }

    /// Returns the commit reference, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalError::MissingField`] when the event carries no
    /// merkle log commit.
    pub fn commit(&self) -> Result<&MerkleLogCommit, CanonicalError> {
        self.merklelog_entry
            .as_ref()
            .and_then(|entry| entry.commit.as_ref())
            .ok_or(CanonicalError::MissingField {
                field: "merklelog_entry.commit",
            })
    }
}

fn update_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

fn update_timestamp(hasher: &mut Sha256, text: &str) -> Result<(), CanonicalError> {
    if text.is_empty() {
        update_str(hasher, "");
        return Ok(());
    }
    let parsed =
        DateTime::parse_from_rfc3339(text).map_err(|_| CanonicalError::BadTimestamp {
            text: text.to_string(),
        })?;
    let normalized = parsed
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    update_str(hasher, &normalized);
    Ok(())
}

fn update_principal(hasher: &mut Sha256, principal: Option<&Principal>) {
    let p = principal.cloned().unwrap_or_default();
    update_str(hasher, &p.issuer);
    update_str(hasher, &p.subject);
    update_str(hasher, &p.display_name);
    update_str(hasher, &p.email);
}

fn update_value(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Null => update_str(hasher, ""),
        Value::Bool(b) => update_str(hasher, if *b { "true" } else { "false" }),
        Value::Number(n) => update_str(hasher, &n.to_string()),
        Value::String(s) => update_str(hasher, s),
        Value::Array(items) => {
            hasher.update((items.len() as u64).to_be_bytes());
            for item in items {
                update_value(hasher, item);
            }
        }
        Value::Object(map) => update_attributes(hasher, map),
    }
}

fn update_attributes(hasher: &mut Sha256, map: &Map<String, Value>) {
    // serde_json's default map is ordered, so iteration is already sorted
    // by key.
    hasher.update((map.len() as u64).to_be_bytes());
    for (key, value) in map {
        update_str(hasher, key);
        update_value(hasher, value);
    }
}

/// Computes the `simple_hash_v3` digest of a v0 event.
///
/// # Errors
///
/// Returns [`CanonicalError::BadTimestamp`] when a non-empty timestamp field
/// is not RFC-3339.
pub fn simple_hash_v3(event: &V3Event) -> Result<[u8; 32], CanonicalError> {
    let mut hasher = Sha256::new();
    update_str(&mut hasher, &event.identity);
    update_str(&mut hasher, &event.asset_identity);
    update_attributes(&mut hasher, &event.event_attributes);
    update_attributes(&mut hasher, &event.asset_attributes);
    update_str(&mut hasher, &event.operation);
    update_str(&mut hasher, &event.behaviour);
    update_timestamp(&mut hasher, &event.timestamp_declared)?;
    update_timestamp(&mut hasher, &event.timestamp_accepted)?;
    update_timestamp(&mut hasher, &event.timestamp_committed)?;
    update_principal(&mut hasher, event.principal_declared.as_ref());
    update_principal(&mut hasher, event.principal_accepted.as_ref());
    update_str(&mut hasher, &event.tenant_identity);
    update_str(&mut hasher, &event.from);
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_JSON: &str = r#"
    {
        "identity": "assets/9ccdc19b-44a1-434c-afab-14f8eac3405c/events/82c9f5c2-fe77-4885-86aa-417f654d3b2f",
        "asset_identity": "assets/9ccdc19b-44a1-434c-afab-14f8eac3405c",
        "event_attributes": {
            "1": "pour flour and milk into bowl",
            "2": "mix together until gloopy"
        },
        "asset_attributes": {},
        "operation": "Record",
        "behaviour": "RecordEvidence",
        "timestamp_declared": "2024-01-24T11:42:16Z",
        "timestamp_accepted": "2024-01-24T11:42:16Z",
        "timestamp_committed": "2024-01-24T11:42:17.121Z",
        "principal_declared": {
            "issuer": "cupcake-world",
            "subject": "chris the cupcake connoisseur",
            "display_name": "chris",
            "email": "chris@example.com"
        },
        "principal_accepted": {
            "issuer": "https://app.example.ai/appidpv1",
            "subject": "924c9054-c342-47a3-a7b8-8c0bfedd37a3",
            "display_name": "API",
            "email": ""
        },
        "from": "0xc98130dc7b292FB485F842785f6F63A520a404A5",
        "tenant_identity": "tenant/15c551cf-40ed-4cdb-a94b-142d6e3c620a",
        "merklelog_entry": {
            "commit": {
                "index": 53,
                "idtimestamp": "0x018d3b472e22146400"
            }
        }
    }
    "#;

    #[test]
    fn parses_v3_event() {
        let event = V3Event::from_json(EVENT_JSON.as_bytes()).unwrap();
        assert_eq!(event.operation, "Record");
        assert_eq!(event.commit().unwrap().index, 53);
        assert_eq!(event.commit().unwrap().idtimestamp, "0x018d3b472e22146400");
    }

    #[test]
    fn commit_index_accepts_string_form() {
        let json = EVENT_JSON.replace("\"index\": 53", "\"index\": \"53\"");
        let event = V3Event::from_json(json.as_bytes()).unwrap();
        assert_eq!(event.commit().unwrap().index, 53);
    }

    #[test]
    fn hash_is_deterministic_across_key_order() {
        let event = V3Event::from_json(EVENT_JSON.as_bytes()).unwrap();
        let reordered = EVENT_JSON.replace(
            "\"1\": \"pour flour and milk into bowl\",\n            \"2\": \"mix together until gloopy\"",
            "\"2\": \"mix together until gloopy\",\n            \"1\": \"pour flour and milk into bowl\"",
        );
        let event2 = V3Event::from_json(reordered.as_bytes()).unwrap();
        assert_eq!(
            simple_hash_v3(&event).unwrap(),
            simple_hash_v3(&event2).unwrap()
        );
    }

    #[test]
    fn hash_changes_with_any_field() {
        let event = V3Event::from_json(EVENT_JSON.as_bytes()).unwrap();
        let mut tampered = event.clone();
        tampered.operation = "record".to_string();
        assert_ne!(
            simple_hash_v3(&event).unwrap(),
            simple_hash_v3(&tampered).unwrap()
        );
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        let mut event = V3Event::from_json(EVENT_JSON.as_bytes()).unwrap();
        let utc = simple_hash_v3(&event).unwrap();
        event.timestamp_declared = "2024-01-24T12:42:16+01:00".to_string();
        assert_eq!(simple_hash_v3(&event).unwrap(), utc);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let mut event = V3Event::from_json(EVENT_JSON.as_bytes()).unwrap();
        event.timestamp_declared = "yesterday".to_string();
        assert!(matches!(
            simple_hash_v3(&event),
            Err(CanonicalError::BadTimestamp { .. })
        ));
    }

    #[test]
    fn missing_commit_is_reported() {
        let event = V3Event::default();
        assert!(matches!(
            event.commit(),
            Err(CanonicalError::MissingField { .. })
        ));
    }
}
