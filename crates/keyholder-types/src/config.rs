//! Configuration with documented defaults.
//!
//! All tunable parameters of the envelope provider live here. Every
//! value has a default; [`KeyholderConfig::validate`] rejects values
//! the KDF would refuse at run time.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CryptoError, Result};

/// Smallest Argon2 memory cost accepted per lane, in KiB.
const MIN_M_COST_PER_LANE: u32 = 8;

/// Argon2id cost parameters.
///
/// | Parameter | Default | Meaning |
/// |-----------|---------|---------|
/// | `m_cost`  | 65 536  | Memory usage in KiB (64 MiB) |
/// | `t_cost`  | 3       | Number of iterations |
/// | `p_cost`  | 1       | Degree of parallelism |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB. Must be at least 8 × `p_cost`.
    pub m_cost: u32,
    /// Time cost (number of passes). Must be at least 1.
    pub t_cost: u32,
    /// Parallelism degree. Must be at least 1.
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

impl KdfParams {
    /// Checks the parameters against Argon2's lower bounds.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.t_cost == 0 {
            return Err(CryptoError::Config {
                reason: format!("{name}.t_cost must be greater than 0"),
            });
        }
        if self.p_cost == 0 {
            return Err(CryptoError::Config {
                reason: format!("{name}.p_cost must be greater than 0"),
            });
        }
        if self.m_cost < MIN_M_COST_PER_LANE.saturating_mul(self.p_cost) {
            return Err(CryptoError::Config {
                reason: format!(
                    "{name}.m_cost must be at least {} KiB for p_cost = {}",
                    MIN_M_COST_PER_LANE.saturating_mul(self.p_cost),
                    self.p_cost
                ),
            });
        }
        Ok(())
    }
}

/// Provider configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyholderConfig {
    /// Argon2id parameters used when locking newly generated or
    /// re-protected private keys. Existing keys carry their own
    /// parameters and are unaffected by changes here.
    pub key_lock_kdf: KdfParams,

    /// Argon2id parameters for login passphrase derivation.
    ///
    /// Derived passphrases unlock keys that already exist, so changing
    /// this breaks every stored key. Leave at the default.
    pub passphrase_kdf: KdfParams,

    /// Seconds a signature's creation time may lie after the requested
    /// validity time and still verify.
    pub max_clock_skew_secs: u64,
}

impl Default for KeyholderConfig {
    fn default() -> Self {
        Self {
            key_lock_kdf: KdfParams::default(),
            passphrase_kdf: KdfParams::default(),
            max_clock_skew_secs: 0,
        }
    }
}

impl KeyholderConfig {
    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        self.key_lock_kdf.validate("key_lock_kdf")?;
        self.passphrase_kdf.validate("passphrase_kdf")?;
        Ok(())
    }

    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| CryptoError::Config {
            reason: format!("failed to read config {}: {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| CryptoError::Config {
            reason: format!("failed to parse config {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }
}
