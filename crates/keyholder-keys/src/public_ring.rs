//! Ring of public keys: encryption target and signature verifiers.

use keyholder_types::{Armored, CryptoError, EncryptedMessage, Result, Signature, UnixTime};

use crate::context::CryptoContext;
use crate::key::PublicKey;

/// Public keys in ring order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PublicKeyRing {
    keys: Vec<PublicKey>,
}

impl PublicKeyRing {
    /// Creates a ring from keys in order.
    pub fn new(keys: Vec<PublicKey>) -> Self {
        Self { keys }
    }

    /// Keys in ring order.
    pub fn keys(&self) -> &[PublicKey] {
        &self.keys
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The first key flagged primary, else the first key.
    ///
    /// # Errors
    ///
    /// [`CryptoError::NoPrimaryKey`] if the ring is empty.
    pub fn primary_key(&self) -> Result<&PublicKey> {
        self.keys
            .iter()
            .find(|k| k.is_primary)
            .or_else(|| self.keys.first())
            .ok_or(CryptoError::NoPrimaryKey)
    }

    /// Armored keys allowed to verify signatures, in ring order.
    pub fn verifiers(&self) -> Vec<Armored> {
        self.keys
            .iter()
            .filter(|k| k.can_verify)
            .map(|k| k.armored.clone())
            .collect()
    }

    /// Primary key, provided it may be encrypted to.
    pub(crate) fn encryption_key(&self) -> Result<&PublicKey> {
        let key = self.primary_key()?;
        if !key.can_encrypt {
            return Err(CryptoError::Encryption {
                reason: "primary key is not usable for encryption".into(),
            });
        }
        Ok(key)
    }

    /// Encrypts text to the primary key.
    pub fn encrypt_text(&self, context: &CryptoContext, text: &str) -> Result<EncryptedMessage> {
        let key = self.encryption_key()?;
        context.provider().encrypt_text(text, &key.armored)
    }

    /// Encrypts bytes to the primary key.
    pub fn encrypt_data(&self, context: &CryptoContext, data: &[u8]) -> Result<EncryptedMessage> {
        let key = self.encryption_key()?;
        context.provider().encrypt_data(data, &key.armored)
    }

    /// `true` if any verifying key accepts the signature at `valid_at`
    /// (zero disables the time check).
    pub fn verify_text(
        &self,
        context: &CryptoContext,
        text: &str,
        signature: &Signature,
        valid_at: UnixTime,
    ) -> bool {
        let provider = context.provider();
        self.keys
            .iter()
            .filter(|k| k.can_verify)
            .any(|k| provider.verify_text(text, signature, &k.armored, valid_at))
    }

    /// Byte variant of [`verify_text`](Self::verify_text).
    pub fn verify_data(
        &self,
        context: &CryptoContext,
        data: &[u8],
        signature: &Signature,
        valid_at: UnixTime,
    ) -> bool {
        let provider = context.provider();
        self.keys
            .iter()
            .filter(|k| k.can_verify)
            .any(|k| provider.verify_data(data, signature, &k.armored, valid_at))
    }
}
