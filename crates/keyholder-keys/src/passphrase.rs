//! Login passphrase derivation and the unlock-with-password flow.
//!
//! A user's keys are locked with a passphrase derived from their login
//! password. At login the passphrase is re-derived, proven against the
//! primary key, protected by the device key store and stored, so later
//! key-ring operations can unlock without the password.

use keyholder_types::{CryptoError, Result, UnlockedSecret};

use crate::context::CryptoContext;
use crate::key::PrivateKey;
use crate::repository::PassphraseRepository;

/// Derives the key passphrase for `password`.
///
/// Deterministic: the same password and salt always produce the same
/// passphrase. `encoded_salt` is standard base64.
pub fn get_passphrase(
    context: &CryptoContext,
    password: &[u8],
    encoded_salt: &str,
) -> Result<UnlockedSecret> {
    context.provider().derive_passphrase(password, encoded_salt)
}

/// Derives the passphrase from `password`, checks that it unlocks the
/// primary of `keys`, and stores it for `user_id`.
///
/// # Errors
///
/// - [`CryptoError::NoPrimaryKey`] if `keys` is empty.
/// - [`CryptoError::Unlock`] if the derived passphrase does not unlock
///   the primary key. Nothing is stored in that case.
/// - [`CryptoError::KeyStore`] if the passphrase cannot be protected or
///   stored.
pub fn unlock_with_password(
    context: &CryptoContext,
    repository: &dyn PassphraseRepository,
    user_id: &str,
    keys: &[PrivateKey],
    password: &[u8],
    encoded_salt: &str,
) -> Result<()> {
    let primary = keys
        .iter()
        .find(|k| k.is_primary)
        .or_else(|| keys.first())
        .ok_or(CryptoError::NoPrimaryKey)?;

    let passphrase = get_passphrase(context, password, encoded_salt)?;
    // The handle is only a proof; dropping it zeroizes the key.
    context
        .provider()
        .unlock(&primary.armored, Some(passphrase.as_bytes()))?;

    let protected = context.key_store().encrypt(&passphrase)?;
    repository.set_passphrase(user_id, protected)?;
    tracing::info!(user_id, "unlocked with password");
    Ok(())
}

/// Forgets the stored passphrase for `user_id`.
pub fn lock_user(repository: &dyn PassphraseRepository, user_id: &str) -> Result<()> {
    repository.clear_passphrase(user_id)?;
    tracing::info!(user_id, "user locked");
    Ok(())
}

/// Returns `keys` with the passphrase stored for `user_id` attached to
/// every key that carries none. Keys stored in clear still unlock.
pub fn attach_stored_passphrase(
    repository: &dyn PassphraseRepository,
    user_id: &str,
    keys: &[PrivateKey],
) -> Result<Vec<PrivateKey>> {
    let stored = repository.get_passphrase(user_id)?;
    Ok(keys
        .iter()
        .cloned()
        .map(|mut key| {
            if key.passphrase.is_none() {
                key.passphrase = stored.clone();
            }
            key
        })
        .collect())
}
