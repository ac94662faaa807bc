//! Persistence of key-store-protected passphrases.
//!
//! Observers register explicitly with a repository instance; there is
//! no process-wide registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use keyholder_types::{CryptoError, EncryptedSecret, Result};

/// Notified whenever a user's stored passphrase changes.
pub trait PassphraseListener: Send + Sync {
    /// `present` is `false` when the passphrase was cleared.
    fn passphrase_changed(&self, user_id: &str, present: bool);
}

/// Stores one protected passphrase per user.
pub trait PassphraseRepository: Send + Sync {
    /// The stored passphrase for `user_id`, if any.
    fn get_passphrase(&self, user_id: &str) -> Result<Option<EncryptedSecret>>;

    /// Stores (or replaces) the passphrase and notifies listeners.
    fn set_passphrase(&self, user_id: &str, passphrase: EncryptedSecret) -> Result<()>;

    /// Removes the passphrase and notifies listeners. Clearing a user
    /// with nothing stored is not an error and notifies nobody.
    fn clear_passphrase(&self, user_id: &str) -> Result<()>;

    /// Registers a listener for subsequent changes.
    fn add_listener(&self, listener: Arc<dyn PassphraseListener>);
}

// ---------------------------------------------------------------------------
// InMemoryPassphraseRepository
// ---------------------------------------------------------------------------

/// Process-local [`PassphraseRepository`].
#[derive(Default)]
pub struct InMemoryPassphraseRepository {
    entries: Mutex<HashMap<String, EncryptedSecret>>,
    listeners: Mutex<Vec<Arc<dyn PassphraseListener>>>,
}

impl InMemoryPassphraseRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, user_id: &str, present: bool) {
        // Snapshot so a listener may call back into the repository.
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners.clone(),
            Err(_) => {
                tracing::error!("passphrase listener lock poisoned");
                return;
            }
        };
        for listener in listeners {
            listener.passphrase_changed(user_id, present);
        }
    }

    fn poisoned() -> CryptoError {
        CryptoError::KeyStore {
            reason: "passphrase repository lock poisoned".into(),
        }
    }
}

impl PassphraseRepository for InMemoryPassphraseRepository {
    fn get_passphrase(&self, user_id: &str) -> Result<Option<EncryptedSecret>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.get(user_id).cloned())
    }

    fn set_passphrase(&self, user_id: &str, passphrase: EncryptedSecret) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| Self::poisoned())?
            .insert(user_id.to_string(), passphrase);
        tracing::info!(user_id, "passphrase stored");
        self.notify(user_id, true);
        Ok(())
    }

    fn clear_passphrase(&self, user_id: &str) -> Result<()> {
        let removed = self
            .entries
            .lock()
            .map_err(|_| Self::poisoned())?
            .remove(user_id)
            .is_some();
        if removed {
            tracing::info!(user_id, "passphrase cleared");
            self.notify(user_id, false);
        }
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn PassphraseListener>) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(listener),
            Err(_) => tracing::error!("passphrase listener lock poisoned"),
        }
    }
}
