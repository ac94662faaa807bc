//! Core shared types for the keyholder workspace.
//!
//! This crate defines the value types exchanged between the crypto
//! provider and the key-ring layer: opaque armored payloads, unlocked
//! key handles, verification results and the central [`CryptoError`].

pub mod config;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// Armored
// ---------------------------------------------------------------------------

/// Armored (ASCII) key material as produced by the crypto provider.
///
/// The key-ring layer never looks inside; it only passes these strings
/// back to the provider.
pub type Armored = String;

/// Unix time in seconds. `0` means "no time constraint" wherever a
/// validity time is accepted.
pub type UnixTime = u64;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Hex-encoded key fingerprint.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already hex-encoded fingerprint.
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// EncryptedMessage
// ---------------------------------------------------------------------------

/// Armored encrypted message. Opaque outside the provider.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncryptedMessage(String);

impl EncryptedMessage {
    /// Wraps an armored message string.
    pub fn new(armored: impl Into<String>) -> Self {
        Self(armored.into())
    }

    /// Returns the armored form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the armored string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EncryptedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Armored detached signature.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(String);

impl Signature {
    /// Wraps an armored signature string.
    pub fn new(armored: impl Into<String>) -> Self {
        Self(armored.into())
    }

    /// Returns the armored form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// EncryptedSecret
// ---------------------------------------------------------------------------

/// A passphrase protected by a device key store.
///
/// Safe to persist: the clear passphrase is only recoverable through
/// the key store that produced it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    /// Wraps an encoded encrypted secret.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Returns the encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// UnlockedKey
// ---------------------------------------------------------------------------

/// Decrypted private key material.
///
/// Owned exclusively by whoever unlocked it and zeroized on drop, so
/// every exit path (return, `?`, panic unwind) scrubs the bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct UnlockedKey {
    bytes: Vec<u8>,
}

impl UnlockedKey {
    /// Takes ownership of decrypted key bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Returns the decrypted key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// UnlockedKey does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// UnlockedSecret
// ---------------------------------------------------------------------------

/// Clear-text secret (passphrase, derived login secret).
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct UnlockedSecret {
    bytes: Vec<u8>,
}

impl UnlockedSecret {
    /// Takes ownership of secret bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copies a passphrase typed by the user.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self {
            bytes: passphrase.as_bytes().to_vec(),
        }
    }

    /// Returns the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the secret holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// UnlockedSecret does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// VerificationStatus
// ---------------------------------------------------------------------------

/// Outcome of checking the signature embedded in a decrypted message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// At least one supplied public key validated the embedded signature.
    Success,
    /// The message carries no embedded signature.
    NotSigned,
    /// The message is signed but no verification key was supplied.
    NoVerifier,
    /// The message is signed but no supplied key validates it.
    Failure,
}

impl VerificationStatus {
    /// Returns `true` only for [`VerificationStatus::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::NotSigned => write!(f, "not-signed"),
            Self::NoVerifier => write!(f, "no-verifier"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decrypted payloads
// ---------------------------------------------------------------------------

/// Text recovered by a decrypt-and-verify call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptedText {
    /// The decrypted text.
    pub text: String,
    /// Result of the embedded-signature check.
    pub status: VerificationStatus,
}

/// Bytes recovered by a decrypt-and-verify call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptedData {
    /// The decrypted bytes.
    pub data: Vec<u8>,
    /// Result of the embedded-signature check.
    pub status: VerificationStatus,
}

// ---------------------------------------------------------------------------
// CryptoError
// ---------------------------------------------------------------------------

/// Central error type for key-holder operations.
///
/// Single-key operations surface the first failure in the matching
/// category; ring-scanning operations only fail after every candidate
/// key has been tried. Verification never produces an error.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CryptoError {
    /// A public key could not be derived from a private key.
    #[error("key derivation failed: {reason}")]
    KeyDerivation {
        /// Human-readable description of the derivation failure.
        reason: String,
    },

    /// A private key could not be unlocked (wrong or missing passphrase).
    #[error("unlock failed: {reason}")]
    Unlock {
        /// Human-readable description of the unlock failure.
        reason: String,
    },

    /// No key could decrypt the message.
    #[error("decryption failed: {reason}")]
    Decryption {
        /// Human-readable description of the decryption failure.
        reason: String,
    },

    /// The message could not be encrypted.
    #[error("encryption failed: {reason}")]
    Encryption {
        /// Human-readable description of the encryption failure.
        reason: String,
    },

    /// The payload could not be signed.
    #[error("signing failed: {reason}")]
    Signing {
        /// Human-readable description of the signing failure.
        reason: String,
    },

    /// An operation needing a primary key ran against an empty ring.
    #[error("no primary key in key ring")]
    NoPrimaryKey,

    /// An armored block or packet could not be parsed.
    #[error("invalid format: {reason}")]
    InvalidFormat {
        /// Human-readable description of the parse failure.
        reason: String,
    },

    /// The key store could not protect or recover a secret.
    #[error("key store error: {reason}")]
    KeyStore {
        /// Human-readable description of the key store failure.
        reason: String,
    },

    /// A configuration value is invalid.
    #[error("config error: {reason}")]
    Config {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`CryptoError`].
pub type Result<T> = std::result::Result<T, CryptoError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
