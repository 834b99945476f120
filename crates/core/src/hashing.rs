//! SHA-256 digests for attachment content.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Digest string stored in attachment metadata, e.g. `sha256-e3b0...`.
pub fn attachment_digest(data: &[u8]) -> String {
    format!("sha256-{}", sha256_hex(data))
}
