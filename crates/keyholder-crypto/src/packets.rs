//! Serialized packet layouts used inside armored blocks.
//!
//! Packets are JSON with hex-encoded binary fields. Every packet
//! carries a `version`; readers reject versions they do not know.

use keyholder_types::{CryptoError, Fingerprint, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::armor::{armor, dearmor, ArmorKind};
use crate::hash::fingerprint;

/// Current packet format version.
pub const PACKET_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Public half of an envelope key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicKeyPacket {
    /// Packet format version.
    pub version: u8,
    /// Free-form identity the key was generated for.
    pub user_id: String,
    /// Unix seconds at generation.
    pub created_at: u64,
    /// Hex Ed25519 verifying key.
    pub signing_key: String,
    /// Hex X25519 public key.
    pub encryption_key: String,
}

impl PublicKeyPacket {
    /// Decodes the Ed25519 verifying key.
    pub fn signing_key_bytes(&self) -> Result<[u8; 32]> {
        decode_fixed(&self.signing_key, "signing key")
    }

    /// Decodes the X25519 public key.
    pub fn encryption_key_bytes(&self) -> Result<[u8; 32]> {
        decode_fixed(&self.encryption_key, "encryption key")
    }

    /// Computes this key's fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(fingerprint(
            &self.signing_key_bytes()?,
            &self.encryption_key_bytes()?,
            self.created_at,
        ))
    }
}

/// How the seed of a private key is stored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "protection", rename_all = "snake_case")]
pub enum SecretMaterial {
    /// Seed stored in clear; unlocks without a passphrase.
    Clear {
        /// Hex seed.
        seed: String,
    },
    /// Seed sealed with an Argon2id-derived key.
    Argon2id {
        /// Argon2 memory cost in KiB.
        m_cost: u32,
        /// Argon2 iterations.
        t_cost: u32,
        /// Argon2 lanes.
        p_cost: u32,
        /// Hex salt.
        salt: String,
        /// Hex XChaCha20 nonce.
        nonce: String,
        /// Hex ciphertext of the seed, tag appended.
        ciphertext: String,
    },
}

impl Drop for SecretMaterial {
    fn drop(&mut self) {
        if let Self::Clear { seed } = self {
            seed.zeroize();
        }
    }
}

/// Full private key: public half plus stored secret.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrivateKeyPacket {
    /// Public half, identical to the derived public key packet.
    pub public: PublicKeyPacket,
    /// Stored seed.
    pub secret: SecretMaterial,
}

// ---------------------------------------------------------------------------
// Literal data and signatures
// ---------------------------------------------------------------------------

/// Whether a payload was produced on the text or the byte path.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralFormat {
    /// UTF-8 text with `\r\n` line endings.
    Text,
    /// Arbitrary bytes.
    Binary,
}

impl LiteralFormat {
    /// Single byte mixed into signed data so a text signature cannot be
    /// replayed as a binary one.
    pub fn tag(self) -> u8 {
        match self {
            Self::Text => b't',
            Self::Binary => b'b',
        }
    }
}

/// Signature packet, detached or embedded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignaturePacket {
    /// Packet format version.
    pub version: u8,
    /// Fingerprint of the signing key.
    pub issuer: String,
    /// Unix seconds at signing.
    pub created_at: u64,
    /// Path the signed payload came from.
    pub format: LiteralFormat,
    /// Hex Ed25519 signature.
    pub signature: String,
}

/// Plaintext sealed inside a message.
#[derive(Debug, Serialize, Deserialize)]
pub struct LiteralPacket {
    /// Path the payload came from.
    pub format: LiteralFormat,
    /// Hex payload.
    pub data: String,
    /// Embedded signature, if the sender signed.
    pub signature: Option<SignaturePacket>,
}

impl Drop for LiteralPacket {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

/// Outer message packet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessagePacket {
    /// Packet format version.
    pub version: u8,
    /// Fingerprint of the recipient key.
    pub recipient: String,
    /// Hex ephemeral X25519 public key.
    pub ephemeral_key: String,
    /// Hex XChaCha20 nonce.
    pub nonce: String,
    /// Hex ciphertext of the serialized [`LiteralPacket`].
    pub ciphertext: String,
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Serializes a packet and armors it.
pub fn encode<T: Serialize>(kind: ArmorKind, packet: &T) -> Result<String> {
    let body = serde_json::to_vec(packet).map_err(|e| CryptoError::InvalidFormat {
        reason: format!("packet serialization failed: {e}"),
    })?;
    Ok(armor(kind, &body))
}

/// Dearmors and parses a packet.
pub fn decode<T: DeserializeOwned>(kind: ArmorKind, text: &str) -> Result<T> {
    let body = dearmor(kind, text)?;
    serde_json::from_slice(&body).map_err(|e| CryptoError::InvalidFormat {
        reason: format!("malformed packet: {e}"),
    })
}

/// Rejects packets from a newer format.
pub fn check_version(version: u8) -> Result<()> {
    if version != PACKET_VERSION {
        return Err(CryptoError::InvalidFormat {
            reason: format!("unsupported packet version {version} (expected {PACKET_VERSION})"),
        });
    }
    Ok(())
}

/// Decodes a hex field of exactly `N` bytes.
pub fn decode_fixed<const N: usize>(hex_str: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(hex_str).map_err(|_| CryptoError::InvalidFormat {
        reason: format!("{what}: invalid hex encoding"),
    })?;
    if bytes.len() != N {
        return Err(CryptoError::InvalidFormat {
            reason: format!("{what}: expected {N} bytes, got {}", bytes.len()),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Decodes a variable-length hex field.
pub fn decode_hex(hex_str: &str, what: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str).map_err(|_| CryptoError::InvalidFormat {
        reason: format!("{what}: invalid hex encoding"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_public() -> PublicKeyPacket {
        PublicKeyPacket {
            version: PACKET_VERSION,
            user_id: "alice@example.org".into(),
            created_at: 1_700_000_000,
            signing_key: hex::encode([0x11; 32]),
            encryption_key: hex::encode([0x22; 32]),
        }
    }

    #[test]
    fn public_packet_roundtrip() -> std::result::Result<(), CryptoError> {
        let packet = sample_public();
        let armored = encode(ArmorKind::PublicKey, &packet)?;
        let parsed: PublicKeyPacket = decode(ArmorKind::PublicKey, &armored)?;
        assert_eq!(parsed.user_id, packet.user_id);
        assert_eq!(parsed.fingerprint()?, packet.fingerprint()?);
        Ok(())
    }

    #[test]
    fn secret_material_tagged_by_protection() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let secret = SecretMaterial::Clear {
            seed: hex::encode([0x33; 32]),
        };
        let json = serde_json::to_string(&secret)?;
        assert!(json.contains(r#""protection":"clear""#));
        Ok(())
    }

    #[test]
    fn decode_fixed_checks_length() {
        assert!(decode_fixed::<32>("abcd", "key").is_err());
        assert!(decode_fixed::<2>("zz00", "key").is_err());
        assert!(matches!(decode_fixed::<2>("abcd", "key"), Ok([0xab, 0xcd])));
    }

    #[test]
    fn future_version_rejected() {
        assert!(check_version(PACKET_VERSION).is_ok());
        assert!(matches!(
            check_version(PACKET_VERSION + 1),
            Err(CryptoError::InvalidFormat { .. })
        ));
    }
}
