//! The per-session view handed to a `use_keys` block.

use keyholder_types::{
    DecryptedData, DecryptedText, EncryptedMessage, Result, Signature, UnixTime,
};

use crate::canonical::canonicalize_text;
use crate::context::CryptoContext;
use crate::private_ring::PrivateKeyRing;
use crate::public_ring::PublicKeyRing;

/// A holder's private ring, its derived public ring, and the crypto
/// context they run on.
///
/// Only [`use_keys`](crate::session::use_keys) creates one, and it is
/// dropped (zeroizing every unlocked key) before `use_keys` returns.
pub struct KeyHolderContext<'a> {
    context: &'a CryptoContext,
    private_key_ring: PrivateKeyRing<'a>,
    public_key_ring: PublicKeyRing,
}

impl<'a> KeyHolderContext<'a> {
    pub(crate) fn new(
        context: &'a CryptoContext,
        private_key_ring: PrivateKeyRing<'a>,
        public_key_ring: PublicKeyRing,
    ) -> Self {
        Self {
            context,
            private_key_ring,
            public_key_ring,
        }
    }

    /// The crypto context.
    pub fn context(&self) -> &CryptoContext {
        self.context
    }

    /// The holder's private keys.
    pub fn private_key_ring(&self) -> &PrivateKeyRing<'a> {
        &self.private_key_ring
    }

    /// Public keys derived from the private ring, flags preserved.
    pub fn public_key_ring(&self) -> &PublicKeyRing {
        &self.public_key_ring
    }

    // -- Encryption -------------------------------------------------------

    /// Encrypts text to the holder's own primary key.
    pub fn encrypt_text(&self, text: &str) -> Result<EncryptedMessage> {
        self.public_key_ring.encrypt_text(self.context, text)
    }

    /// Encrypts bytes to the holder's own primary key.
    pub fn encrypt_data(&self, data: &[u8]) -> Result<EncryptedMessage> {
        self.public_key_ring.encrypt_data(self.context, data)
    }

    /// Decrypts text with any of the holder's keys.
    pub fn decrypt_text(&self, message: &EncryptedMessage) -> Result<String> {
        self.private_key_ring.decrypt_text(message)
    }

    /// Decrypts bytes with any of the holder's keys.
    pub fn decrypt_data(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        self.private_key_ring.decrypt_data(message)
    }

    /// [`decrypt_text`](Self::decrypt_text), `None` on failure.
    pub fn decrypt_text_or_none(&self, message: &EncryptedMessage) -> Option<String> {
        self.private_key_ring.decrypt_text_or_none(message)
    }

    /// [`decrypt_data`](Self::decrypt_data), `None` on failure.
    pub fn decrypt_data_or_none(&self, message: &EncryptedMessage) -> Option<Vec<u8>> {
        self.private_key_ring.decrypt_data_or_none(message)
    }

    // -- Signatures -------------------------------------------------------

    /// Signs text with the primary key.
    pub fn sign_text(&self, text: &str) -> Result<Signature> {
        self.private_key_ring.sign_text(text)
    }

    /// Signs bytes with the primary key.
    pub fn sign_data(&self, data: &[u8]) -> Result<Signature> {
        self.private_key_ring.sign_data(data)
    }

    /// Checks a text signature against the holder's own public keys.
    pub fn verify_text(&self, text: &str, signature: &Signature, valid_at: UnixTime) -> bool {
        self.public_key_ring
            .verify_text(self.context, text, signature, valid_at)
    }

    /// Checks a byte signature against the holder's own public keys.
    pub fn verify_data(&self, data: &[u8], signature: &Signature, valid_at: UnixTime) -> bool {
        self.public_key_ring
            .verify_data(self.context, data, signature, valid_at)
    }

    // -- Combined ---------------------------------------------------------

    /// Encrypts text to `recipient`'s primary key, embedding a signature
    /// by this holder's primary key.
    pub fn encrypt_and_sign_text(
        &self,
        text: &str,
        recipient: &PublicKeyRing,
    ) -> Result<EncryptedMessage> {
        let target = recipient.encryption_key()?;
        let signer = self.private_key_ring.signing_key()?;
        self.context
            .provider()
            .encrypt_and_sign_text(text, &target.armored, signer)
    }

    /// Byte variant of [`encrypt_and_sign_text`](Self::encrypt_and_sign_text).
    pub fn encrypt_and_sign_data(
        &self,
        data: &[u8],
        recipient: &PublicKeyRing,
    ) -> Result<EncryptedMessage> {
        let target = recipient.encryption_key()?;
        let signer = self.private_key_ring.signing_key()?;
        self.context
            .provider()
            .encrypt_and_sign_data(data, &target.armored, signer)
    }

    /// Decrypts with this holder's keys and checks the embedded
    /// signature against `verifiers`. Text comes back with `\n` line
    /// endings.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Decryption`](keyholder_types::CryptoError::Decryption)
    /// if no key opens the message. A bad or missing signature is not an
    /// error; it shows in the returned status.
    pub fn decrypt_and_verify_text(
        &self,
        message: &EncryptedMessage,
        verifiers: &PublicKeyRing,
        valid_at: UnixTime,
    ) -> Result<DecryptedText> {
        let provider = self.context.provider();
        let verifiers = verifiers.verifiers();
        let decrypted = self.private_key_ring.decrypt_with(|key| {
            provider.decrypt_and_verify_text(message, &verifiers, &[key], valid_at)
        })?;
        tracing::debug!(status = %decrypted.status, "decrypted and verified text");
        Ok(DecryptedText {
            text: canonicalize_text(&decrypted.text),
            status: decrypted.status,
        })
    }

    /// Byte variant of [`decrypt_and_verify_text`](Self::decrypt_and_verify_text).
    /// Bytes are returned exactly as sent.
    pub fn decrypt_and_verify_data(
        &self,
        message: &EncryptedMessage,
        verifiers: &PublicKeyRing,
        valid_at: UnixTime,
    ) -> Result<DecryptedData> {
        let provider = self.context.provider();
        let verifiers = verifiers.verifiers();
        let decrypted = self.private_key_ring.decrypt_with(|key| {
            provider.decrypt_and_verify_data(message, &verifiers, &[key], valid_at)
        })?;
        tracing::debug!(status = %decrypted.status, "decrypted and verified data");
        Ok(decrypted)
    }

    /// [`decrypt_and_verify_text`](Self::decrypt_and_verify_text), `None`
    /// if decryption fails.
    pub fn decrypt_and_verify_text_or_none(
        &self,
        message: &EncryptedMessage,
        verifiers: &PublicKeyRing,
        valid_at: UnixTime,
    ) -> Option<DecryptedText> {
        self.decrypt_and_verify_text(message, verifiers, valid_at).ok()
    }

    /// [`decrypt_and_verify_data`](Self::decrypt_and_verify_data), `None`
    /// if decryption fails.
    pub fn decrypt_and_verify_data_or_none(
        &self,
        message: &EncryptedMessage,
        verifiers: &PublicKeyRing,
        valid_at: UnixTime,
    ) -> Option<DecryptedData> {
        self.decrypt_and_verify_data(message, verifiers, valid_at).ok()
    }
}
