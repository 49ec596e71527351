use sha2::{Digest, Sha256};

use crate::constants::OBFUSCATED_DOMAIN;

/// Hex-encoded SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Stable replacement FQDN for a hostname.
///
/// The same host always maps to the same name, so uploads from one machine
/// can still be correlated without revealing it.
pub fn hash_hostname(hostname: &str) -> String {
    format!("{}.{}", sha256_hex(hostname.trim().as_bytes()), OBFUSCATED_DOMAIN)
}
