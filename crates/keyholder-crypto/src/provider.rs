//! The `CryptoProvider` seam.
//!
//! Everything above this trait treats keys, messages and signatures as
//! opaque armored strings. A provider owns the formats; the key-ring
//! layer only decides which key to use.

use keyholder_types::{
    Armored, DecryptedData, DecryptedText, EncryptedMessage, Fingerprint, Result, Signature,
    UnixTime, UnlockedKey, UnlockedSecret,
};

/// Public-key operations over armored keys.
///
/// Verification methods return `bool` and never fail: malformed input
/// simply does not verify.
pub trait CryptoProvider: Send + Sync {
    /// Generates a new private key for `user_id`, locked with
    /// `passphrase` when given.
    fn generate_key(&self, user_id: &str, passphrase: Option<&[u8]>) -> Result<Armored>;

    /// Unlocks an armored private key.
    ///
    /// [`CryptoError::Unlock`](keyholder_types::CryptoError::Unlock) on a
    /// wrong or missing passphrase.
    fn unlock(&self, private_key: &str, passphrase: Option<&[u8]>) -> Result<UnlockedKey>;

    /// Re-armors an unlocked key under a (possibly different) passphrase.
    fn lock(&self, key: &UnlockedKey, passphrase: Option<&[u8]>) -> Result<Armored>;

    /// Derives the public key of an armored private key.
    ///
    /// [`CryptoError::KeyDerivation`](keyholder_types::CryptoError::KeyDerivation)
    /// if the private key cannot be parsed.
    fn public_key(&self, private_key: &str) -> Result<Armored>;

    /// Fingerprint of an armored public or private key.
    fn fingerprint(&self, key: &str) -> Result<Fingerprint>;

    /// Encrypts text to `public_key`.
    fn encrypt_text(&self, text: &str, public_key: &str) -> Result<EncryptedMessage>;

    /// Encrypts bytes to `public_key`.
    fn encrypt_data(&self, data: &[u8], public_key: &str) -> Result<EncryptedMessage>;

    /// Decrypts a text message with one unlocked key. Line endings come
    /// back as stored in the message.
    fn decrypt_text(&self, message: &EncryptedMessage, key: &UnlockedKey) -> Result<String>;

    /// Decrypts a byte message with one unlocked key.
    fn decrypt_data(&self, message: &EncryptedMessage, key: &UnlockedKey) -> Result<Vec<u8>>;

    /// Produces a detached text signature.
    fn sign_text(&self, text: &str, key: &UnlockedKey) -> Result<Signature>;

    /// Produces a detached byte signature.
    fn sign_data(&self, data: &[u8], key: &UnlockedKey) -> Result<Signature>;

    /// Checks a detached text signature. `valid_at` of zero skips the
    /// time check.
    fn verify_text(
        &self,
        text: &str,
        signature: &Signature,
        public_key: &str,
        valid_at: UnixTime,
    ) -> bool;

    /// Checks a detached byte signature.
    fn verify_data(
        &self,
        data: &[u8],
        signature: &Signature,
        public_key: &str,
        valid_at: UnixTime,
    ) -> bool;

    /// Encrypts text to `public_key` with a signature by `signer`
    /// embedded inside the envelope.
    fn encrypt_and_sign_text(
        &self,
        text: &str,
        public_key: &str,
        signer: &UnlockedKey,
    ) -> Result<EncryptedMessage>;

    /// Byte variant of [`encrypt_and_sign_text`](Self::encrypt_and_sign_text).
    fn encrypt_and_sign_data(
        &self,
        data: &[u8],
        public_key: &str,
        signer: &UnlockedKey,
    ) -> Result<EncryptedMessage>;

    /// Decrypts with the first key in `keys` that works, then checks the
    /// embedded signature against `verifiers`.
    fn decrypt_and_verify_text(
        &self,
        message: &EncryptedMessage,
        verifiers: &[Armored],
        keys: &[&UnlockedKey],
        valid_at: UnixTime,
    ) -> Result<DecryptedText>;

    /// Byte variant of [`decrypt_and_verify_text`](Self::decrypt_and_verify_text).
    fn decrypt_and_verify_data(
        &self,
        message: &EncryptedMessage,
        verifiers: &[Armored],
        keys: &[&UnlockedKey],
        valid_at: UnixTime,
    ) -> Result<DecryptedData>;

    /// Stretches a login password into a key passphrase.
    ///
    /// `encoded_salt` is standard base64. The same inputs always yield
    /// the same output.
    fn derive_passphrase(&self, password: &[u8], encoded_salt: &str) -> Result<UnlockedSecret>;
}
