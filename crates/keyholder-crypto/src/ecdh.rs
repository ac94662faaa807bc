//! X25519 key agreement.
//!
//! Envelope keys do not store a separate encryption secret: the X25519
//! secret is derived from the Ed25519 seed (lower half of SHA-512, as in
//! RFC 8032 key expansion), so one seed yields both halves of the pair.

use rand::rngs::OsRng;
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::signing::SEED_LEN;

/// Long-lived X25519 secret derived from a key seed.
///
/// `x25519-dalek` zeroizes the inner secret on drop.
pub struct EncryptionSecret(x25519_dalek::StaticSecret);

impl EncryptionSecret {
    /// Derives the X25519 secret belonging to an Ed25519 seed.
    ///
    /// Intermediate hash output is scrubbed before returning.
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let mut hash_bytes = [0u8; 64];
        hash_bytes.copy_from_slice(&Sha512::digest(seed));

        let mut secret_bytes = [0u8; 32];
        secret_bytes.copy_from_slice(&hash_bytes[..32]);
        hash_bytes.zeroize();

        let secret = x25519_dalek::StaticSecret::from(secret_bytes);
        secret_bytes.zeroize();
        Self(secret)
    }

    /// Returns the matching public key bytes.
    pub fn public_key(&self) -> [u8; 32] {
        *x25519_dalek::PublicKey::from(&self.0).as_bytes()
    }

    /// Computes the shared secret with a peer's public key.
    pub fn agree(&self, their_public: &[u8; 32]) -> SharedSecret {
        let peer = x25519_dalek::PublicKey::from(*their_public);
        SharedSecret(*self.0.diffie_hellman(&peer).as_bytes())
    }
}

// EncryptionSecret does not implement Clone/Debug to prevent leakage.

/// Single-use X25519 secret generated per message.
pub struct EphemeralSecret(x25519_dalek::StaticSecret);

impl EphemeralSecret {
    /// Draws a fresh secret from OS entropy.
    pub fn generate() -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(OsRng))
    }

    /// Returns the public key to transmit with the message.
    pub fn public_key(&self) -> [u8; 32] {
        *x25519_dalek::PublicKey::from(&self.0).as_bytes()
    }

    /// Consumes the secret and computes the shared secret.
    pub fn agree(self, their_public: &[u8; 32]) -> SharedSecret {
        let peer = x25519_dalek::PublicKey::from(*their_public);
        SharedSecret(*self.0.diffie_hellman(&peer).as_bytes())
    }
}

/// Raw X25519 output. Never used directly as a cipher key; always fed
/// through HKDF first.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Returns the raw 32 bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}
