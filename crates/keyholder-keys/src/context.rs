//! Shared crypto collaborators.

use std::sync::Arc;

use keyholder_crypto::{CryptoProvider, EnvelopeProvider, KeyStoreCrypto};
use keyholder_types::config::KeyholderConfig;
use keyholder_types::Result;

/// The provider and key store every key ring operates through.
///
/// Cheap to clone; both collaborators are shared read-only.
#[derive(Clone)]
pub struct CryptoContext {
    provider: Arc<dyn CryptoProvider>,
    key_store: Arc<dyn KeyStoreCrypto>,
}

impl CryptoContext {
    /// Creates a context from explicit collaborators.
    pub fn new(provider: Arc<dyn CryptoProvider>, key_store: Arc<dyn KeyStoreCrypto>) -> Self {
        Self {
            provider,
            key_store,
        }
    }

    /// Creates a context backed by [`EnvelopeProvider`] with `config`.
    pub fn with_envelope(config: KeyholderConfig, key_store: Arc<dyn KeyStoreCrypto>) -> Result<Self> {
        Ok(Self::new(Arc::new(EnvelopeProvider::new(config)?), key_store))
    }

    /// The crypto provider.
    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    /// The key store protecting stored passphrases.
    pub fn key_store(&self) -> &dyn KeyStoreCrypto {
        self.key_store.as_ref()
    }
}

impl std::fmt::Debug for CryptoContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoContext").finish_non_exhaustive()
    }
}
