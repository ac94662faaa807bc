//! Private and public key records.
//!
//! A [`PrivateKey`] is what a key holder persists: the armored key, its
//! role flags and, when the key is locked, its passphrase protected by
//! the device key store. A [`PublicKey`] is always derived from a
//! private key, never stored independently.

use keyholder_crypto::CryptoProvider;
use keyholder_types::{Armored, EncryptedSecret, Result, UnlockedSecret};
use serde::{Deserialize, Serialize};

use crate::context::CryptoContext;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// Armored private key plus usage flags.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrivateKey {
    /// Armored private key.
    pub armored: Armored,
    /// Preferred key for encryption and signing.
    #[serde(default)]
    pub is_primary: bool,
    /// Inactive keys still decrypt old messages.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether messages may be encrypted to this key.
    #[serde(default = "default_true")]
    pub can_encrypt: bool,
    /// Whether this key's signatures are accepted.
    #[serde(default = "default_true")]
    pub can_verify: bool,
    /// Key-store-protected passphrase; `None` for keys stored in clear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<EncryptedSecret>,
}

impl PrivateKey {
    /// Wraps an armored key with default flags (not primary, active,
    /// usable for encryption and verification).
    pub fn new(armored: impl Into<Armored>, passphrase: Option<EncryptedSecret>) -> Self {
        Self {
            armored: armored.into(),
            is_primary: false,
            is_active: true,
            can_encrypt: true,
            can_verify: true,
            passphrase,
        }
    }

    /// Sets the primary flag.
    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    /// Generates a fresh key for `user_id`.
    ///
    /// With a passphrase the key is locked under it and the passphrase
    /// is stored through the context's key store; without one the key
    /// is stored in clear.
    pub fn generate(
        context: &CryptoContext,
        user_id: &str,
        passphrase: Option<&UnlockedSecret>,
    ) -> Result<Self> {
        let armored = context
            .provider()
            .generate_key(user_id, passphrase.map(UnlockedSecret::as_bytes))?;
        let protected = passphrase
            .map(|secret| context.key_store().encrypt(secret))
            .transpose()?;
        tracing::info!(user_id, locked = protected.is_some(), "generated private key");
        Ok(Self::new(armored, protected))
    }

    /// Derives the matching public key, carrying the flags over.
    ///
    /// # Errors
    ///
    /// [`CryptoError::KeyDerivation`](keyholder_types::CryptoError::KeyDerivation)
    /// if the armored key is malformed.
    pub fn to_public(&self, provider: &dyn CryptoProvider) -> Result<PublicKey> {
        Ok(PublicKey {
            armored: provider.public_key(&self.armored)?,
            is_primary: self.is_primary,
            is_active: self.is_active,
            can_encrypt: self.can_encrypt,
            can_verify: self.can_verify,
        })
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Armored public key plus usage flags.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    /// Armored public key.
    pub armored: Armored,
    /// Preferred key for encryption.
    #[serde(default)]
    pub is_primary: bool,
    /// Mirrors the private key's flag.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether messages may be encrypted to this key.
    #[serde(default = "default_true")]
    pub can_encrypt: bool,
    /// Whether this key's signatures are accepted.
    #[serde(default = "default_true")]
    pub can_verify: bool,
}

impl PublicKey {
    /// Wraps an armored public key with default flags.
    pub fn new(armored: impl Into<Armored>) -> Self {
        Self {
            armored: armored.into(),
            is_primary: false,
            is_active: true,
            can_encrypt: true,
            can_verify: true,
        }
    }

    /// Sets the primary flag.
    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flags_take_defaults() -> std::result::Result<(), serde_json::Error> {
        let key: PrivateKey = serde_json::from_str(r#"{"armored":"k"}"#)?;
        assert!(!key.is_primary);
        assert!(key.is_active && key.can_encrypt && key.can_verify);
        assert!(key.passphrase.is_none());
        Ok(())
    }

    #[test]
    fn clear_key_serializes_without_passphrase() -> std::result::Result<(), serde_json::Error> {
        let json = serde_json::to_string(&PrivateKey::new("k", None).primary(true))?;
        assert!(!json.contains("passphrase"));
        assert!(json.contains(r#""is_primary":true"#));
        Ok(())
    }
}
