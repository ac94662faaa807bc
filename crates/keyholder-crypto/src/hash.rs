//! SHA3-256 hashing and key fingerprints.

use keyholder_types::Fingerprint;
use sha3::{Digest, Sha3_256};

/// Domain prefix mixed into every fingerprint.
const FINGERPRINT_PREFIX: &[u8] = b"keyholder:fpr:v1:";

/// Computes the SHA3-256 digest of `data`.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(data));
    out
}

/// Computes the fingerprint of a key from its public halves and
/// creation time.
///
/// ```text
/// fpr = hex(SHA3-256("keyholder:fpr:v1:" || signing_pub(32) || encryption_pub(32) || created_at_be(8)))
/// ```
pub fn fingerprint(signing_pub: &[u8; 32], encryption_pub: &[u8; 32], created_at: u64) -> Fingerprint {
    let mut hasher = Sha3_256::new();
    hasher.update(FINGERPRINT_PREFIX);
    hasher.update(signing_pub);
    hasher.update(encryption_pub);
    hasher.update(created_at.to_be_bytes());
    Fingerprint::new(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// NIST SHA3-256 test vector: "abc".
    #[test]
    fn sha3_256_abc() {
        let expected = [
            0x3a, 0x98, 0x5d, 0xa7, 0x4f, 0xe2, 0x25, 0xb2,
            0x04, 0x5c, 0x17, 0x2d, 0x6b, 0xd3, 0x90, 0xbd,
            0x85, 0x5f, 0x08, 0x6e, 0x3e, 0x9d, 0x52, 0x5b,
            0x46, 0xbf, 0xe2, 0x45, 0x11, 0x43, 0x15, 0x32,
        ];
        assert_eq!(sha3_256(b"abc"), expected);
    }

    #[test]
    fn fingerprint_is_64_hex_chars() {
        let fpr = fingerprint(&[0x01; 32], &[0x02; 32], 1_700_000_000);
        assert_eq!(fpr.as_str().len(), 64);
        assert!(fpr.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn creation_time_changes_fingerprint() {
        let a = fingerprint(&[0x01; 32], &[0x02; 32], 1);
        let b = fingerprint(&[0x01; 32], &[0x02; 32], 2);
        assert_ne!(a, b);
    }
}
