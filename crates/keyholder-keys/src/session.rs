//! Scoped access to a key holder's keys.
//!
//! [`use_keys`] is the only way to obtain a [`KeyHolderContext`]. The
//! context borrows into the call and is dropped before it returns, on
//! success, on error and during a panic unwind alike, so unlocked keys
//! never outlive the block.

use keyholder_types::{CryptoError, Result};
use serde::{Deserialize, Serialize};

use crate::context::CryptoContext;
use crate::holder_context::KeyHolderContext;
use crate::key::{PrivateKey, PublicKey};
use crate::private_ring::PrivateKeyRing;
use crate::public_ring::PublicKeyRing;

/// Anything that owns a list of private keys (a user, an address).
pub trait KeyHolder {
    /// Private keys in ring order.
    fn private_keys(&self) -> &[PrivateKey];
}

impl KeyHolder for [PrivateKey] {
    fn private_keys(&self) -> &[PrivateKey] {
        self
    }
}

impl KeyHolder for Vec<PrivateKey> {
    fn private_keys(&self) -> &[PrivateKey] {
        self
    }
}

/// A serializable key holder.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Holder {
    /// Identity the keys belong to.
    pub user_id: String,
    /// Private keys in ring order.
    #[serde(default)]
    pub keys: Vec<PrivateKey>,
}

impl Holder {
    /// Creates a holder without keys.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            keys: Vec::new(),
        }
    }
}

impl KeyHolder for Holder {
    fn private_keys(&self) -> &[PrivateKey] {
        &self.keys
    }
}

/// Derives the public key of every private key, in order.
///
/// # Errors
///
/// [`CryptoError::KeyDerivation`] for the first malformed private key.
pub fn derive_public_keys(context: &CryptoContext, keys: &[PrivateKey]) -> Result<Vec<PublicKey>> {
    keys.iter()
        .map(|key| key.to_public(context.provider()))
        .collect()
}

/// Runs `block` with a [`KeyHolderContext`] over `holder`'s keys.
///
/// Public keys are derived from the private keys up front; private keys
/// are unlocked lazily as the block uses them. Every unlocked key is
/// zeroized before this function returns.
///
/// # Errors
///
/// [`CryptoError::KeyDerivation`] (converted into `E`) if a private key
/// is malformed, otherwise whatever `block` returns.
pub fn use_keys<H, R, E, F>(holder: &H, context: &CryptoContext, block: F) -> std::result::Result<R, E>
where
    H: KeyHolder + ?Sized,
    E: From<CryptoError>,
    F: FnOnce(&KeyHolderContext<'_>) -> std::result::Result<R, E>,
{
    let private_keys = holder.private_keys().to_vec();
    let public_keys = derive_public_keys(context, &private_keys)?;
    let key_count = private_keys.len();

    let holder_context = KeyHolderContext::new(
        context,
        PrivateKeyRing::new(context, private_keys),
        PublicKeyRing::new(public_keys),
    );
    tracing::info!(keys = key_count, "key holder session opened");

    let result = block(&holder_context);

    let unlocked = holder_context.private_key_ring().unlocked_count();
    drop(holder_context);
    tracing::info!(keys = key_count, unlocked, ok = result.is_ok(), "key holder session closed");
    result
}
