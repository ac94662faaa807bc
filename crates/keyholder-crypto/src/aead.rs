//! XChaCha20-Poly1305 sealing.
//!
//! Every seal draws a fresh 192-bit nonce from OS entropy and returns
//! it alongside the ciphertext. The 16-byte Poly1305 tag is appended to
//! the ciphertext by the cipher.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use keyholder_types::{CryptoError, Result};
use rand::rngs::OsRng;
use rand::RngCore;

/// Byte length of an XChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 24;

/// Byte length of the Poly1305 tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Nonce plus ciphertext (tag included) produced by [`seal`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sealed {
    /// Nonce used for this seal.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
}

/// Encrypts `plaintext` under `key`, authenticating `aad` as well.
///
/// # Errors
///
/// [`CryptoError::Encryption`] if the cipher rejects the input.
pub fn seal(key: &[u8; 32], plaintext: &[u8], aad: &[u8]) -> Result<Sealed> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| CryptoError::Encryption {
            reason: format!("failed to generate nonce: {e}"),
        })?;
    seal_with_nonce(key, nonce, plaintext, aad)
}

/// Encrypts with a caller-chosen nonce. The nonce must never repeat
/// under the same key.
pub fn seal_with_nonce(
    key: &[u8; 32],
    nonce: [u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Sealed> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: plaintext,
        aad,
    };

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), payload)
        .map_err(|e| CryptoError::Encryption {
            reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
        })?;

    Ok(Sealed { nonce, ciphertext })
}

/// Decrypts and authenticates a [`Sealed`] value.
///
/// # Errors
///
/// [`CryptoError::Decryption`] on tag mismatch: wrong key, wrong AAD,
/// or tampered nonce/ciphertext. Callers re-map the category where a
/// failure means something more specific (a wrong passphrase, say).
pub fn open(key: &[u8; 32], sealed: &Sealed, aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: &sealed.ciphertext,
        aad,
    };

    cipher
        .decrypt(XNonce::from_slice(&sealed.nonce), payload)
        .map_err(|e| CryptoError::Decryption {
            reason: format!("XChaCha20-Poly1305 decryption failed: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() -> std::result::Result<(), CryptoError> {
        let key = [0x42u8; 32];
        let sealed = seal(&key, b"hello keyholder", b"aad")?;
        assert_eq!(sealed.ciphertext.len(), b"hello keyholder".len() + TAG_LEN);

        let opened = open(&key, &sealed, b"aad")?;
        assert_eq!(opened, b"hello keyholder");
        Ok(())
    }

    #[test]
    fn wrong_key_fails() -> std::result::Result<(), CryptoError> {
        let sealed = seal(&[0x42u8; 32], b"secret", b"")?;
        assert!(matches!(
            open(&[0x43u8; 32], &sealed, b""),
            Err(CryptoError::Decryption { .. })
        ));
        Ok(())
    }

    #[test]
    fn wrong_aad_fails() -> std::result::Result<(), CryptoError> {
        let key = [0x42u8; 32];
        let sealed = seal(&key, b"secret", b"header-a")?;
        assert!(open(&key, &sealed, b"header-b").is_err());
        Ok(())
    }

    #[test]
    fn tampered_ciphertext_fails() -> std::result::Result<(), CryptoError> {
        let key = [0x42u8; 32];
        let mut sealed = seal(&key, b"secret", b"")?;
        if let Some(byte) = sealed.ciphertext.first_mut() {
            *byte ^= 0xFF;
        }
        assert!(open(&key, &sealed, b"").is_err());
        Ok(())
    }

    #[test]
    fn fixed_nonce_is_deterministic() -> std::result::Result<(), CryptoError> {
        let key = [0xAA; 32];
        let a = seal_with_nonce(&key, [0xBB; NONCE_LEN], b"determinism", b"")?;
        let b = seal_with_nonce(&key, [0xBB; NONCE_LEN], b"determinism", b"")?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn fresh_nonces_differ() -> std::result::Result<(), CryptoError> {
        let key = [0x01; 32];
        let a = seal(&key, b"x", b"")?;
        let b = seal(&key, b"x", b"")?;
        assert_ne!(a.nonce, b.nonce);
        Ok(())
    }
}
