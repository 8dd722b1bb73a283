use sha2::{Digest, Sha256};

use crate::models::Observation;

/// Compute the SHA-256 digest of an observation, returned as 64-char hex.
///
/// Hashes `service:token` for every entry in the observation's order, which
/// is already sorted by service name. Display text does not participate, so
/// renaming a status kind does not register as a change.
pub fn fingerprint(observation: &Observation) -> String {
    let mut hasher = Sha256::new();
    for entry in observation.statuses() {
        hasher.update(entry.service.name.as_bytes());
        hasher.update(b":");
        hasher.update(entry.status.token.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

pub fn has_changed(previous: &str, current: &str) -> bool {
    previous != current
}
