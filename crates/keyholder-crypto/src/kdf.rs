//! Argon2id key derivation.
//!
//! Turns a passphrase and salt into 32 bytes of key material. Used both
//! to lock private keys at rest and to derive login passphrases from
//! user passwords.

use keyholder_types::config::KdfParams;
use keyholder_types::{CryptoError, Result};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum acceptable salt length (RFC 9106 recommends at least 16
/// bytes; the library enforces 8).
pub const MIN_SALT_LEN: usize = 8;

/// 256-bit key derived by Argon2id. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Fixed byte length of the derived key.
    pub const LEN: usize = 32;

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// DerivedKey does not implement Clone/Debug to prevent leakage.

/// Derives a 256-bit key from `password` and `salt` using Argon2id
/// v0x13.
///
/// # Errors
///
/// - [`CryptoError::Config`] if the parameters are out of range or the
///   salt is shorter than [`MIN_SALT_LEN`].
/// - [`CryptoError::KeyDerivation`] if the Argon2 computation fails.
pub fn argon2id_derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<DerivedKey> {
    if salt.len() < MIN_SALT_LEN {
        return Err(CryptoError::Config {
            reason: format!(
                "salt must be at least {MIN_SALT_LEN} bytes, got {}",
                salt.len()
            ),
        });
    }

    let argon2_params = argon2::Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(DerivedKey::LEN),
    )
    .map_err(|e| CryptoError::Config {
        reason: format!("invalid Argon2 parameters: {e}"),
    })?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2_params,
    );

    let mut output = [0u8; DerivedKey::LEN];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation {
            reason: format!("Argon2id derivation failed: {e}"),
        })?;

    Ok(DerivedKey(output))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> KdfParams {
        KdfParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        }
    }

    #[test]
    fn derive_key_is_deterministic() -> std::result::Result<(), CryptoError> {
        let salt = b"0123456789abcdef";
        let key1 = argon2id_derive_key(b"correct horse", salt, &test_params())?;
        let key2 = argon2id_derive_key(b"correct horse", salt, &test_params())?;
        assert_eq!(key1.as_bytes(), key2.as_bytes());
        Ok(())
    }

    #[test]
    fn different_password_different_key() -> std::result::Result<(), CryptoError> {
        let salt = b"0123456789abcdef";
        let a = argon2id_derive_key(b"password_a", salt, &test_params())?;
        let b = argon2id_derive_key(b"password_b", salt, &test_params())?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn different_salt_different_key() -> std::result::Result<(), CryptoError> {
        let a = argon2id_derive_key(b"pw", b"salt_aaaaaaa_aaa", &test_params())?;
        let b = argon2id_derive_key(b"pw", b"salt_bbbbbbb_bbb", &test_params())?;
        assert_ne!(a.as_bytes(), b.as_bytes());
        Ok(())
    }

    #[test]
    fn salt_too_short_rejected() {
        let result = argon2id_derive_key(b"pw", b"short", &test_params());
        assert!(matches!(result, Err(CryptoError::Config { .. })));
    }

    #[test]
    fn zero_t_cost_rejected() {
        let params = KdfParams {
            t_cost: 0,
            ..test_params()
        };
        assert!(argon2id_derive_key(b"pw", b"0123456789abcdef", &params).is_err());
    }

    #[test]
    fn empty_password_is_allowed() -> std::result::Result<(), CryptoError> {
        let key = argon2id_derive_key(b"", b"0123456789abcdef", &test_params())?;
        assert_ne!(key.as_bytes(), &[0u8; 32]);
        Ok(())
    }
}
