//! Cryptographic layer for the keyholder workspace.
//!
//! All raw cryptography lives in this crate. Higher layers see only the
//! [`CryptoProvider`] and [`KeyStoreCrypto`] traits and opaque armored
//! strings.
//!
//! # Modules
//!
//! - [`signing`]: Ed25519 key pairs, signing and strict verification
//! - [`ecdh`]: X25519 key agreement
//! - [`hkdf`]: HKDF-SHA256 message-key expansion
//! - [`aead`]: XChaCha20-Poly1305 sealing
//! - [`kdf`]: Argon2id derivation for key locking and login passphrases
//! - [`hash`]: SHA3-256 and key fingerprints
//! - [`armor`]: ASCII armor with checksum
//! - [`packets`]: JSON packet layouts
//! - [`provider`]: the [`CryptoProvider`] trait
//! - [`envelope`]: [`EnvelopeProvider`], the built-in provider
//! - [`keystore`]: [`KeyStoreCrypto`] and [`AeadKeyStore`]

pub mod aead;
pub mod armor;
pub mod ecdh;
pub mod envelope;
pub mod hash;
pub mod hkdf;
pub mod kdf;
pub mod keystore;
pub mod packets;
pub mod provider;
pub mod signing;

pub use envelope::EnvelopeProvider;
pub use keystore::{AeadKeyStore, KeyStoreCrypto};
pub use provider::CryptoProvider;
