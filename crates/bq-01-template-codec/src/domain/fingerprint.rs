//! Template fingerprints.

use sha2::{Digest, Sha256};
use shared_types::TemplateFingerprint;

/// Number of SHA-256 bytes kept in a fingerprint.
pub const FINGERPRINT_BYTES: usize = 8;

/// Short one-way digest identifying a template (or any raw field) in audit
/// records and logs without revealing it.
pub fn fingerprint(bytes: &[u8]) -> TemplateFingerprint {
    let digest = Sha256::digest(bytes);
    TemplateFingerprint::from_hex(hex::encode(&digest[..FINGERPRINT_BYTES]))
}
