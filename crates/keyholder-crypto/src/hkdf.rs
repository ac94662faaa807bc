//! HKDF-SHA256 expansion of X25519 outputs into cipher keys.

use hkdf::Hkdf;
use keyholder_types::{CryptoError, Result};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain separator for message keys. Keys derived here are independent
/// of anything else derived from the same shared secret.
const ENVELOPE_SALT: &[u8] = b"keyholder-envelope-v1";

/// 256-bit symmetric key for one message. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MessageKey([u8; 32]);

impl MessageKey {
    /// Returns the key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// MessageKey does not implement Clone/Debug to prevent leakage.

/// Derives the per-message key.
///
/// `info` binds the key to the exchange; the envelope passes
/// `ephemeral_public || recipient_public`.
///
/// ```text
/// key = HKDF-SHA256(IKM = shared, salt = "keyholder-envelope-v1", info, L = 32)
/// ```
pub fn derive_message_key(shared: &[u8; 32], info: &[u8]) -> Result<MessageKey> {
    let hk = Hkdf::<Sha256>::new(Some(ENVELOPE_SALT), shared);
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm).map_err(|e| CryptoError::Encryption {
        reason: format!("HKDF-SHA256 expansion failed: {e}"),
    })?;
    Ok(MessageKey(okm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() -> std::result::Result<(), CryptoError> {
        let a = derive_message_key(&[0x42; 32], b"info")?;
        let b = derive_message_key(&[0x42; 32], b"info")?;
        assert_eq!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn info_changes_key() -> std::result::Result<(), CryptoError> {
        let a = derive_message_key(&[0x42; 32], b"info-a")?;
        let b = derive_message_key(&[0x42; 32], b"info-b")?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn key_differs_from_input() -> std::result::Result<(), CryptoError> {
        let shared = [0x42; 32];
        let key = derive_message_key(&shared, b"")?;
        assert_ne!(key.as_bytes(), &shared);
        Ok(())
    }
}
