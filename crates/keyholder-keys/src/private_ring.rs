//! Ring of a holder's private keys with lazy, cached unlocking.
//!
//! Each key is unlocked at most once per ring: the first operation that
//! needs it runs the passphrase lookup and the provider unlock, and the
//! outcome (handle or error) is cached for the rest of the ring's life.
//! Dropping the ring zeroizes every cached handle.

use std::cell::OnceCell;

use keyholder_types::{CryptoError, EncryptedMessage, Result, Signature, UnlockedKey};

use crate::canonical::canonicalize_text;
use crate::context::CryptoContext;
use crate::key::PrivateKey;

type UnlockSlot = OnceCell<Result<UnlockedKey>>;

/// Private keys of one holder, bound to a [`CryptoContext`].
///
/// `Send` but not `Sync`: the unlock cache is filled through `&self`.
pub struct PrivateKeyRing<'a> {
    context: &'a CryptoContext,
    keys: Vec<PrivateKey>,
    slots: Vec<UnlockSlot>,
}

impl<'a> PrivateKeyRing<'a> {
    /// Creates a ring; nothing is unlocked yet.
    pub fn new(context: &'a CryptoContext, keys: Vec<PrivateKey>) -> Self {
        let slots = keys.iter().map(|_| OnceCell::new()).collect();
        Self {
            context,
            keys,
            slots,
        }
    }

    /// Keys in ring order.
    pub fn keys(&self) -> &[PrivateKey] {
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
    pub fn primary_key(&self) -> Result<&PrivateKey> {
        Ok(&self.keys[self.primary_index()?])
    }

    fn primary_index(&self) -> Result<usize> {
        if self.keys.is_empty() {
            return Err(CryptoError::NoPrimaryKey);
        }
        Ok(self.keys.iter().position(|k| k.is_primary).unwrap_or(0))
    }

    /// Primary first, then the remaining keys in ring order.
    fn decryption_order(&self) -> Vec<usize> {
        let Ok(primary) = self.primary_index() else {
            return Vec::new();
        };
        std::iter::once(primary)
            .chain((0..self.keys.len()).filter(|&i| i != primary))
            .collect()
    }

    // -- Unlocking --------------------------------------------------------

    fn unlock_key(&self, index: usize) -> Result<UnlockedKey> {
        let key = &self.keys[index];
        let provider = self.context.provider();
        let result = match &key.passphrase {
            None => provider.unlock(&key.armored, None),
            // The clear passphrase is zeroized when the closure returns.
            Some(protected) => self
                .context
                .key_store()
                .decrypt(protected)
                .map_err(|e| CryptoError::Unlock {
                    reason: format!("stored passphrase unavailable: {e}"),
                })
                .and_then(|passphrase| provider.unlock(&key.armored, Some(passphrase.as_bytes()))),
        };
        match &result {
            Ok(_) => tracing::debug!(index, "unlocked private key"),
            Err(e) => tracing::warn!(index, error = %e, "failed to unlock private key"),
        }
        result
    }

    /// Unlocked handle of the key at `index`, unlocking on first use.
    pub fn unlocked_key(&self, index: usize) -> Result<&UnlockedKey> {
        let slot = self.slots.get(index).ok_or_else(|| CryptoError::Unlock {
            reason: format!("no key at index {index}"),
        })?;
        slot.get_or_init(|| self.unlock_key(index))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Unlocked handle of the primary key.
    ///
    /// # Errors
    ///
    /// [`CryptoError::NoPrimaryKey`] on an empty ring,
    /// [`CryptoError::Unlock`] on a wrong or missing passphrase.
    pub fn unlocked_primary_key(&self) -> Result<&UnlockedKey> {
        self.unlocked_key(self.primary_index()?)
    }

    /// Primary handle for signing. An empty ring stays
    /// [`CryptoError::NoPrimaryKey`]; an unlock failure becomes
    /// [`CryptoError::Signing`].
    pub(crate) fn signing_key(&self) -> Result<&UnlockedKey> {
        self.unlocked_primary_key().map_err(|e| match e {
            CryptoError::NoPrimaryKey => e,
            other => signing_error(other),
        })
    }

    /// Every key that unlocks, primary first. Keys that fail to unlock
    /// are skipped.
    pub fn unlocked_keys(&self) -> Vec<&UnlockedKey> {
        self.decryption_order()
            .into_iter()
            .filter_map(|i| self.unlocked_key(i).ok())
            .collect()
    }

    /// Number of keys currently holding an unlocked handle.
    pub fn unlocked_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.get(), Some(Ok(_))))
            .count()
    }

    /// Zeroizes every cached handle. Later operations unlock again.
    pub fn release(&mut self) {
        let released = self.unlocked_count();
        for slot in &mut self.slots {
            slot.take();
        }
        if released > 0 {
            tracing::debug!(released, "released unlocked keys");
        }
    }

    // -- Decryption -------------------------------------------------------

    /// Runs `decrypt` over the unlockable keys, primary first, unlocking
    /// each only when reached. The first success wins.
    pub(crate) fn decrypt_with<T>(&self, decrypt: impl Fn(&UnlockedKey) -> Result<T>) -> Result<T> {
        for index in self.decryption_order() {
            let Ok(key) = self.unlocked_key(index) else {
                continue;
            };
            match decrypt(key) {
                Ok(value) => return Ok(value),
                Err(e) => tracing::debug!(index, error = %e, "key did not decrypt message"),
            }
        }
        Err(CryptoError::Decryption {
            reason: format!("none of {} keys could decrypt the message", self.keys.len()),
        })
    }

    /// Decrypts a text message; line endings come back as `\n`.
    ///
    /// # Errors
    ///
    /// [`CryptoError::Decryption`] once every key has been tried.
    pub fn decrypt_text(&self, message: &EncryptedMessage) -> Result<String> {
        let provider = self.context.provider();
        self.decrypt_with(|key| provider.decrypt_text(message, key))
            .map(|text| canonicalize_text(&text))
    }

    /// Decrypts a byte message exactly as sent.
    pub fn decrypt_data(&self, message: &EncryptedMessage) -> Result<Vec<u8>> {
        let provider = self.context.provider();
        self.decrypt_with(|key| provider.decrypt_data(message, key))
    }

    /// Like [`decrypt_text`](Self::decrypt_text), `None` on failure.
    pub fn decrypt_text_or_none(&self, message: &EncryptedMessage) -> Option<String> {
        self.decrypt_text(message).ok()
    }

    /// Like [`decrypt_data`](Self::decrypt_data), `None` on failure.
    pub fn decrypt_data_or_none(&self, message: &EncryptedMessage) -> Option<Vec<u8>> {
        self.decrypt_data(message).ok()
    }

    // -- Signing ----------------------------------------------------------

    /// Signs text with the primary key.
    pub fn sign_text(&self, text: &str) -> Result<Signature> {
        let key = self.signing_key()?;
        self.context
            .provider()
            .sign_text(text, key)
            .map_err(signing_error)
    }

    /// Signs bytes with the primary key.
    pub fn sign_data(&self, data: &[u8]) -> Result<Signature> {
        let key = self.signing_key()?;
        self.context
            .provider()
            .sign_data(data, key)
            .map_err(signing_error)
    }
}

impl Drop for PrivateKeyRing<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

fn signing_error(e: CryptoError) -> CryptoError {
    match e {
        CryptoError::Signing { .. } => e,
        other => CryptoError::Signing {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use keyholder_crypto::AeadKeyStore;
    use keyholder_types::config::{KdfParams, KeyholderConfig};
    use keyholder_types::{EncryptedSecret, UnlockedSecret};

    use super::*;

    fn context() -> CryptoContext {
        let light = KdfParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        };
        let config = KeyholderConfig {
            key_lock_kdf: light,
            passphrase_kdf: light,
            max_clock_skew_secs: 0,
        };
        CryptoContext::with_envelope(config, Arc::new(AeadKeyStore::new([7; 32]))).unwrap()
    }

    #[test]
    fn empty_ring_has_no_primary() {
        let ctx = context();
        let ring = PrivateKeyRing::new(&ctx, Vec::new());
        assert_eq!(ring.primary_key().err(), Some(CryptoError::NoPrimaryKey));
        assert_eq!(ring.unlocked_primary_key().err(), Some(CryptoError::NoPrimaryKey));
        assert!(ring.unlocked_keys().is_empty());
    }

    #[test]
    fn primary_flag_wins_over_position() -> std::result::Result<(), CryptoError> {
        let ctx = context();
        let first = PrivateKey::generate(&ctx, "a", None)?;
        let second = PrivateKey::generate(&ctx, "b", None)?.primary(true);
        let ring = PrivateKeyRing::new(&ctx, vec![first, second.clone()]);
        assert_eq!(ring.primary_key()?, &second);
        assert_eq!(ring.decryption_order(), vec![1, 0]);
        Ok(())
    }

    #[test]
    fn first_key_is_primary_when_none_flagged() -> std::result::Result<(), CryptoError> {
        let ctx = context();
        let first = PrivateKey::generate(&ctx, "a", None)?;
        let second = PrivateKey::generate(&ctx, "b", None)?;
        let ring = PrivateKeyRing::new(&ctx, vec![first.clone(), second]);
        assert_eq!(ring.primary_key()?, &first);
        Ok(())
    }

    #[test]
    fn unlock_is_cached_and_released() -> std::result::Result<(), CryptoError> {
        let ctx = context();
        let pass = UnlockedSecret::from_passphrase("pw");
        let key = PrivateKey::generate(&ctx, "a", Some(&pass))?;
        let mut ring = PrivateKeyRing::new(&ctx, vec![key]);

        assert_eq!(ring.unlocked_count(), 0);
        let first = ring.unlocked_primary_key()? as *const UnlockedKey;
        let again = ring.unlocked_primary_key()? as *const UnlockedKey;
        assert_eq!(first, again);
        assert_eq!(ring.unlocked_count(), 1);

        ring.release();
        assert_eq!(ring.unlocked_count(), 0);
        assert!(ring.unlocked_primary_key().is_ok());
        Ok(())
    }

    #[test]
    fn unlock_failure_is_cached_as_error() -> std::result::Result<(), CryptoError> {
        let ctx = context();
        let right = UnlockedSecret::from_passphrase("right");
        let mut key = PrivateKey::generate(&ctx, "a", Some(&right))?;
        key.passphrase = Some(ctx.key_store().encrypt(&UnlockedSecret::from_passphrase("wrong"))?);
        let ring = PrivateKeyRing::new(&ctx, vec![key]);

        assert!(matches!(ring.unlocked_primary_key(), Err(CryptoError::Unlock { .. })));
        assert!(matches!(ring.sign_text("x"), Err(CryptoError::Signing { .. })));
        assert_eq!(ring.unlocked_count(), 0);
        Ok(())
    }

    #[test]
    fn unrecoverable_stored_passphrase_is_unlock_error() -> std::result::Result<(), CryptoError> {
        let ctx = context();
        let pass = UnlockedSecret::from_passphrase("pw");
        let mut key = PrivateKey::generate(&ctx, "a", Some(&pass))?;
        key.passphrase = Some(EncryptedSecret::new("AAAA"));
        let ring = PrivateKeyRing::new(&ctx, vec![key]);

        match ring.unlocked_primary_key() {
            Err(CryptoError::Unlock { reason }) => assert!(reason.contains("stored passphrase")),
            other => panic!("expected Unlock, got {:?}", other.err()),
        }
        assert!(matches!(ring.sign_data(b"x"), Err(CryptoError::Signing { .. })));
        Ok(())
    }

    #[test]
    fn out_of_range_index_is_unlock_error() {
        let ctx = context();
        let ring = PrivateKeyRing::new(&ctx, Vec::new());
        assert!(matches!(ring.unlocked_key(3), Err(CryptoError::Unlock { .. })));
    }
}
