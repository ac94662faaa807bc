//! Ed25519 signing keys.
//!
//! A key pair is always rebuilt from its 32-byte seed; the seed is the
//! only secret an envelope private key stores. `ed25519-dalek` zeroizes
//! the signing key on drop.

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use keyholder_types::{CryptoError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

/// Byte length of an Ed25519 seed.
pub const SEED_LEN: usize = 32;

/// Byte length of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 signing key pair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generates a fresh seed from OS entropy.
    ///
    /// The seed is returned wrapped so it is scrubbed once the caller
    /// has locked or stored it.
    pub fn generate_seed() -> Result<Zeroizing<[u8; SEED_LEN]>> {
        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| CryptoError::KeyDerivation {
                reason: format!("failed to generate key seed: {e}"),
            })?;
        Ok(seed)
    }

    /// Rebuilds the key pair from its seed. Deterministic.
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the 32-byte verifying key.
    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Signs `message`.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }
}

// Keypair does not implement Clone/Debug to prevent leakage.

/// Checks an Ed25519 signature with strict (non-malleable) rules.
///
/// Returns `false` for a malformed public key as well as for a bad
/// signature; callers only need the yes/no answer.
pub fn verify(public_key: &[u8; 32], message: &[u8], signature: &[u8; SIGNATURE_LEN]) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature);
    vk.verify_strict(message, &sig).is_ok()
}
