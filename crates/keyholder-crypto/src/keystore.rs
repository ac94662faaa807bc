//! Device-bound protection of stored passphrases.
//!
//! Passphrases derived at login are never persisted in clear. A
//! [`KeyStoreCrypto`] wraps them with a secret held by the device (an OS
//! keychain, a hardware-backed key, or, for [`AeadKeyStore`], a 32-byte
//! master key supplied by the host application).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use keyholder_types::{CryptoError, EncryptedSecret, Result, UnlockedSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::aead::{self, Sealed, NONCE_LEN, TAG_LEN};

/// AAD binding stored passphrases to this key store format.
const KEYSTORE_AAD: &[u8] = b"keyholder-keystore-v1";

/// Protects and recovers passphrases with a device-held secret.
pub trait KeyStoreCrypto: Send + Sync {
    /// Encrypts a clear secret for storage.
    fn encrypt(&self, secret: &UnlockedSecret) -> Result<EncryptedSecret>;

    /// Recovers a clear secret. The result is zeroized on drop.
    fn decrypt(&self, secret: &EncryptedSecret) -> Result<UnlockedSecret>;
}

/// [`KeyStoreCrypto`] over XChaCha20-Poly1305 with a fixed master key.
///
/// Stored form: `base64(nonce(24) || ciphertext || tag(16))`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AeadKeyStore {
    master_key: [u8; 32],
}

// AeadKeyStore does not implement Clone/Debug to prevent leakage.

impl AeadKeyStore {
    /// Creates a key store from a 32-byte master key.
    pub fn new(master_key: [u8; 32]) -> Self {
        Self { master_key }
    }

    /// Creates a key store from a hex-encoded master key.
    pub fn from_hex(master_key_hex: &str) -> Result<Self> {
        let bytes = Zeroizing::new(hex::decode(master_key_hex.trim()).map_err(|_| {
            CryptoError::KeyStore {
                reason: "master key is not valid hex".into(),
            }
        })?);
        if bytes.len() != 32 {
            return Err(CryptoError::KeyStore {
                reason: format!("master key must be 32 bytes, got {}", bytes.len()),
            });
        }
        let mut master_key = [0u8; 32];
        master_key.copy_from_slice(&bytes);
        Ok(Self { master_key })
    }
}

impl KeyStoreCrypto for AeadKeyStore {
    fn encrypt(&self, secret: &UnlockedSecret) -> Result<EncryptedSecret> {
        let sealed = aead::seal(&self.master_key, secret.as_bytes(), KEYSTORE_AAD).map_err(|e| {
            CryptoError::KeyStore {
                reason: e.to_string(),
            }
        })?;
        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.ciphertext.len());
        blob.extend_from_slice(&sealed.nonce);
        blob.extend_from_slice(&sealed.ciphertext);
        Ok(EncryptedSecret::new(STANDARD.encode(blob)))
    }

    fn decrypt(&self, secret: &EncryptedSecret) -> Result<UnlockedSecret> {
        let blob = STANDARD
            .decode(secret.as_str())
            .map_err(|e| CryptoError::KeyStore {
                reason: format!("stored secret is not valid base64: {e}"),
            })?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::KeyStore {
                reason: "stored secret is truncated".into(),
            });
        }
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&blob[..NONCE_LEN]);
        let sealed = Sealed {
            nonce,
            ciphertext: blob[NONCE_LEN..].to_vec(),
        };
        let clear = aead::open(&self.master_key, &sealed, KEYSTORE_AAD).map_err(|_| {
            CryptoError::KeyStore {
                reason: "stored secret was not sealed by this key store".into(),
            }
        })?;
        Ok(UnlockedSecret::new(clear))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() -> std::result::Result<(), CryptoError> {
        let store = AeadKeyStore::new([0x11; 32]);
        let stored = store.encrypt(&UnlockedSecret::from_passphrase("correct horse"))?;
        assert!(!stored.as_str().contains("correct"));
        assert_eq!(store.decrypt(&stored)?.as_bytes(), b"correct horse");
        Ok(())
    }

    #[test]
    fn other_master_key_fails() -> std::result::Result<(), CryptoError> {
        let stored = AeadKeyStore::new([0x11; 32]).encrypt(&UnlockedSecret::from_passphrase("x"))?;
        assert!(matches!(
            AeadKeyStore::new([0x22; 32]).decrypt(&stored),
            Err(CryptoError::KeyStore { .. })
        ));
        Ok(())
    }

    #[test]
    fn truncated_blob_fails() {
        let store = AeadKeyStore::new([0x11; 32]);
        assert!(store.decrypt(&EncryptedSecret::new("AAAA")).is_err());
        assert!(store.decrypt(&EncryptedSecret::new("not base64!")).is_err());
    }

    #[test]
    fn from_hex_checks_length() {
        assert!(AeadKeyStore::from_hex(&"ab".repeat(32)).is_ok());
        assert!(AeadKeyStore::from_hex("abcd").is_err());
        assert!(AeadKeyStore::from_hex("zz").is_err());
    }
}
