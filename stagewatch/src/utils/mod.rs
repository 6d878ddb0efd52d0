//! Utility functions for identifiers, fingerprints and timestamps.

pub mod timestamps;
mod ids;

pub use ids::{fingerprint, generate_id, generate_uuid};
pub use timestamps::{duration_between, elapsed_since, iso_timestamp, now_utc, Timestamp};

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
