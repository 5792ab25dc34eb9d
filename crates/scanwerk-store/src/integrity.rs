// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact fingerprints: SHA-256 over the exported PDF bytes.

use sha2::{Digest, Sha256};

/// Hex digits of the digest used in artifact file names.
pub const SHORT_DIGEST_LEN: usize = 8;

/// Lowercase hex SHA-256 of `data`.
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// The first [`SHORT_DIGEST_LEN`] hex digits of [`hash_bytes`].
pub fn short_digest(data: &[u8]) -> String {
    let mut full = hash_bytes(data);
    full.truncate(SHORT_DIGEST_LEN);
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(
            hash_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(short_digest(b"hello"), "2cf24dba");
    }
}
