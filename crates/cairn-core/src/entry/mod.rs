//! Verifiable app entries.
//!
//! An [`AppEntry`] is the caller-supplied description of one committed log
//! entry, built entirely from application data - nothing in it is sourced
//! from the log. The verifier re-derives the committed leaf hash from the
//! entry and never trusts leaf bytes it did not derive itself.

mod appentry;
mod assetsv2;
mod eventsv1;

pub use appentry::{pack_extra_bytes, AppDomain, AppEntry, MMR_SALT_SIZE};
pub use assetsv2::{assets_v2_entries, assets_v2_entry, ASSETS_V2_APP_DOMAIN};
pub use eventsv1::{
    events_v1_entries, events_v1_entry, events_v1_extra_bytes, EVENTS_V1_APP_DOMAIN,
};
