//! Key rings and scoped key-holder sessions.
//!
//! A key holder owns a list of [`PrivateKey`]s. [`use_keys`] opens a
//! session over them: public keys are derived, private keys unlock on
//! demand through the [`CryptoContext`], and everything unlocked is
//! zeroized when the session ends.
//!
//! # Modules
//!
//! - [`key`]: private and public key records with usage flags
//! - [`context`]: the provider and key store a session runs on
//! - [`private_ring`]: decryption and signing with cached unlocks
//! - [`public_ring`]: encryption and verification
//! - [`holder_context`]: the session view handed to a block
//! - [`session`]: [`use_keys`] and the [`KeyHolder`] trait
//! - [`canonical`]: newline canonicalization of decrypted text
//! - [`passphrase`]: login passphrase derivation and unlock flow
//! - [`repository`]: storage of protected passphrases

pub mod canonical;
pub mod context;
pub mod holder_context;
pub mod key;
pub mod passphrase;
pub mod private_ring;
pub mod public_ring;
pub mod repository;
pub mod session;

pub use context::CryptoContext;
pub use holder_context::KeyHolderContext;
pub use key::{PrivateKey, PublicKey};
pub use passphrase::{get_passphrase, lock_user, unlock_with_password};
pub use private_ring::PrivateKeyRing;
pub use public_ring::PublicKeyRing;
pub use repository::{InMemoryPassphraseRepository, PassphraseListener, PassphraseRepository};
pub use session::{use_keys, Holder, KeyHolder};
