//! `EnvelopeProvider`: the built-in [`CryptoProvider`].
//!
//! # Keys
//!
//! One 32-byte seed per key. The Ed25519 signing key is the seed itself;
//! the X25519 encryption key is derived from it (see [`crate::ecdh`]).
//! Private keys store the seed either in clear or sealed under an
//! Argon2id-derived key:
//!
//! ```text
//! lock_key   = Argon2id(passphrase, salt(16), config.key_lock_kdf)
//! ciphertext = XChaCha20-Poly1305(lock_key, nonce, seed, AAD = "keyholder-secret-key-v1")
//! ```
//!
//! # Messages
//!
//! ```text
//! eph              = fresh X25519 secret
//! message_key      = HKDF(X25519(eph, recipient), info = eph_pub || recipient_pub)
//! header           = "keyholder:msg:v1:" || recipient_fpr || eph_pub
//! ciphertext       = XChaCha20-Poly1305(message_key, nonce, literal, AAD = header)
//! ```
//!
//! The literal packet carries the payload, its format, and an optional
//! embedded signature, so a signature on a message is only visible to
//! its recipient.
//!
//! # Signatures
//!
//! ```text
//! signed = "keyholder:sig:v1:" || format_tag || created_at_be(8) || payload
//! ```
//!
//! Text payloads are signed and encrypted with `\r\n` line endings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use keyholder_types::config::{KdfParams, KeyholderConfig};
use keyholder_types::{
    Armored, CryptoError, DecryptedData, DecryptedText, EncryptedMessage, Fingerprint, Result,
    Signature, UnixTime, UnlockedKey, UnlockedSecret, VerificationStatus,
};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::aead::{self, Sealed, NONCE_LEN};
use crate::armor::ArmorKind;
use crate::ecdh::{EncryptionSecret, EphemeralSecret};
use crate::hkdf::derive_message_key;
use crate::kdf::argon2id_derive_key;
use crate::packets::{
    check_version, decode, decode_fixed, decode_hex, encode, LiteralFormat, LiteralPacket,
    MessagePacket, PrivateKeyPacket, PublicKeyPacket, SecretMaterial, SignaturePacket,
    PACKET_VERSION,
};
use crate::provider::CryptoProvider;
use crate::signing::{self, Keypair, SEED_LEN, SIGNATURE_LEN};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// AAD binding a sealed seed to its purpose.
const SECRET_KEY_AAD: &[u8] = b"keyholder-secret-key-v1";

/// Prefix of the authenticated message header.
const MESSAGE_HEADER_PREFIX: &[u8] = b"keyholder:msg:v1:";

/// Prefix of every signed byte string.
const SIGNATURE_PREFIX: &[u8] = b"keyholder:sig:v1:";

/// Salt length for locking private keys.
const LOCK_SALT_LEN: usize = 16;

/// Leading bytes of an unlocked key handle.
const UNLOCKED_MAGIC: &[u8; 4] = b"KHU1";

/// `magic(4) || created_at(8) || seed(32)`; the user id follows.
const UNLOCKED_FIXED_LEN: usize = 4 + 8 + SEED_LEN;

// ---------------------------------------------------------------------------
// SecretKey
// ---------------------------------------------------------------------------

/// Decoded private key. Lives only for the duration of one operation.
struct SecretKey {
    seed: Zeroizing<[u8; SEED_LEN]>,
    created_at: u64,
    user_id: String,
}

impl SecretKey {
    /// Serializes into the opaque handle handed to callers.
    ///
    /// ```text
    /// "KHU1" || created_at_be(8) || seed(32) || user_id (UTF-8)
    /// ```
    fn to_unlocked(&self) -> UnlockedKey {
        let mut bytes = Vec::with_capacity(UNLOCKED_FIXED_LEN + self.user_id.len());
        bytes.extend_from_slice(UNLOCKED_MAGIC);
        bytes.extend_from_slice(&self.created_at.to_be_bytes());
        bytes.extend_from_slice(&self.seed[..]);
        bytes.extend_from_slice(self.user_id.as_bytes());
        UnlockedKey::new(bytes)
    }

    /// Parses a handle produced by [`to_unlocked`](Self::to_unlocked).
    fn from_unlocked(key: &UnlockedKey) -> Option<Self> {
        let bytes = key.as_bytes();
        if bytes.len() < UNLOCKED_FIXED_LEN || &bytes[..4] != UNLOCKED_MAGIC {
            return None;
        }
        let mut created = [0u8; 8];
        created.copy_from_slice(&bytes[4..12]);
        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        seed.copy_from_slice(&bytes[12..UNLOCKED_FIXED_LEN]);
        let user_id = std::str::from_utf8(&bytes[UNLOCKED_FIXED_LEN..]).ok()?;
        Some(Self {
            seed,
            created_at: u64::from_be_bytes(created),
            user_id: user_id.to_string(),
        })
    }

    fn keypair(&self) -> Keypair {
        Keypair::from_seed(&self.seed)
    }

    fn encryption_secret(&self) -> EncryptionSecret {
        EncryptionSecret::from_seed(&self.seed)
    }

    fn public_packet(&self) -> PublicKeyPacket {
        PublicKeyPacket {
            version: PACKET_VERSION,
            user_id: self.user_id.clone(),
            created_at: self.created_at,
            signing_key: hex::encode(self.keypair().public_key()),
            encryption_key: hex::encode(self.encryption_secret().public_key()),
        }
    }

    fn fingerprint(&self) -> Fingerprint {
        crate::hash::fingerprint(
            &self.keypair().public_key(),
            &self.encryption_secret().public_key(),
            self.created_at,
        )
    }
}

// SecretKey does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now() -> UnixTime {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Converts any line ending convention to `\r\n`.
fn to_crlf(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\r\n")
}

fn header_aad(recipient: &str, ephemeral_pub: &[u8; 32]) -> Vec<u8> {
    let mut aad = Vec::with_capacity(MESSAGE_HEADER_PREFIX.len() + recipient.len() + 32);
    aad.extend_from_slice(MESSAGE_HEADER_PREFIX);
    aad.extend_from_slice(recipient.as_bytes());
    aad.extend_from_slice(ephemeral_pub);
    aad
}

fn signed_bytes(format: LiteralFormat, created_at: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(SIGNATURE_PREFIX.len() + 9 + payload.len());
    out.extend_from_slice(SIGNATURE_PREFIX);
    out.push(format.tag());
    out.extend_from_slice(&created_at.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Reads a public key from either public or private key armor.
fn load_public(key: &str) -> Result<PublicKeyPacket> {
    let public = match decode::<PublicKeyPacket>(ArmorKind::PublicKey, key) {
        Ok(public) => public,
        Err(_) => decode::<PrivateKeyPacket>(ArmorKind::PrivateKey, key)?.public,
    };
    check_version(public.version)?;
    Ok(public)
}

fn encryption_error(e: CryptoError) -> CryptoError {
    match e {
        CryptoError::Encryption { .. } => e,
        other => CryptoError::Encryption {
            reason: other.to_string(),
        },
    }
}

fn decryption_error(e: CryptoError) -> CryptoError {
    match e {
        CryptoError::Decryption { .. } => e,
        other => CryptoError::Decryption {
            reason: other.to_string(),
        },
    }
}

fn unlock_error(e: CryptoError) -> CryptoError {
    match e {
        CryptoError::Unlock { .. } => e,
        other => CryptoError::Unlock {
            reason: other.to_string(),
        },
    }
}

fn signer(key: &UnlockedKey) -> Result<SecretKey> {
    SecretKey::from_unlocked(key).ok_or_else(|| CryptoError::Signing {
        reason: "unlocked key handle is malformed".into(),
    })
}

// ---------------------------------------------------------------------------
// EnvelopeProvider
// ---------------------------------------------------------------------------

/// Built-in provider over Ed25519 / X25519 / XChaCha20-Poly1305.
///
/// Stateless apart from its configuration; share it behind an `Arc`.
#[derive(Clone, Debug)]
pub struct EnvelopeProvider {
    config: KeyholderConfig,
}

impl EnvelopeProvider {
    /// Creates a provider after validating `config`.
    pub fn new(config: KeyholderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &KeyholderConfig {
        &self.config
    }

    fn seal_private(&self, key: &SecretKey, passphrase: Option<&[u8]>) -> Result<Armored> {
        let secret = match passphrase {
            None => SecretMaterial::Clear {
                seed: hex::encode(&key.seed[..]),
            },
            Some(passphrase) => {
                let mut salt = [0u8; LOCK_SALT_LEN];
                OsRng
                    .try_fill_bytes(&mut salt)
                    .map_err(|e| CryptoError::Encryption {
                        reason: format!("failed to generate salt: {e}"),
                    })?;
                let params = self.config.key_lock_kdf;
                let lock_key = argon2id_derive_key(passphrase, &salt, &params)?;
                let sealed = aead::seal(lock_key.as_bytes(), &key.seed[..], SECRET_KEY_AAD)?;
                SecretMaterial::Argon2id {
                    m_cost: params.m_cost,
                    t_cost: params.t_cost,
                    p_cost: params.p_cost,
                    salt: hex::encode(salt),
                    nonce: hex::encode(sealed.nonce),
                    ciphertext: hex::encode(&sealed.ciphertext),
                }
            }
        };

        let packet = PrivateKeyPacket {
            public: key.public_packet(),
            secret,
        };
        encode(ArmorKind::PrivateKey, &packet)
    }

    fn open_private(&self, private_key: &str, passphrase: Option<&[u8]>) -> Result<SecretKey> {
        let packet: PrivateKeyPacket = decode(ArmorKind::PrivateKey, private_key)?;
        check_version(packet.public.version)?;

        let seed: Zeroizing<[u8; SEED_LEN]> = match &packet.secret {
            SecretMaterial::Clear { seed } => Zeroizing::new(decode_fixed(seed, "seed")?),
            SecretMaterial::Argon2id {
                m_cost,
                t_cost,
                p_cost,
                salt,
                nonce,
                ciphertext,
            } => {
                let passphrase = passphrase.ok_or_else(|| CryptoError::Unlock {
                    reason: "private key is locked and no passphrase was supplied".into(),
                })?;
                let params = KdfParams {
                    m_cost: *m_cost,
                    t_cost: *t_cost,
                    p_cost: *p_cost,
                };
                let salt = decode_hex(salt, "salt")?;
                let lock_key = argon2id_derive_key(passphrase, &salt, &params)?;
                let sealed = Sealed {
                    nonce: decode_fixed::<NONCE_LEN>(nonce, "nonce")?,
                    ciphertext: decode_hex(ciphertext, "ciphertext")?,
                };
                let plain = Zeroizing::new(
                    aead::open(lock_key.as_bytes(), &sealed, SECRET_KEY_AAD).map_err(|_| {
                        CryptoError::Unlock {
                            reason: "wrong passphrase".into(),
                        }
                    })?,
                );
                if plain.len() != SEED_LEN {
                    return Err(CryptoError::Unlock {
                        reason: format!("sealed seed has {} bytes", plain.len()),
                    });
                }
                let mut seed = Zeroizing::new([0u8; SEED_LEN]);
                seed.copy_from_slice(&plain);
                seed
            }
        };

        let key = SecretKey {
            seed,
            created_at: packet.public.created_at,
            user_id: packet.public.user_id.clone(),
        };
        if hex::encode(key.keypair().public_key()) != packet.public.signing_key {
            return Err(CryptoError::Unlock {
                reason: "secret material does not match the public key".into(),
            });
        }
        Ok(key)
    }

    fn encrypt_literal(&self, literal: &LiteralPacket, public_key: &str) -> Result<EncryptedMessage> {
        let public = load_public(public_key)?;
        let recipient_pub = public.encryption_key_bytes()?;
        let recipient = public.fingerprint()?;

        let ephemeral = EphemeralSecret::generate();
        let ephemeral_pub = ephemeral.public_key();
        let shared = ephemeral.agree(&recipient_pub);
        if shared.as_bytes() == &[0u8; 32] {
            return Err(CryptoError::Encryption {
                reason: "recipient key is a low-order point".into(),
            });
        }

        let mut info = Vec::with_capacity(64);
        info.extend_from_slice(&ephemeral_pub);
        info.extend_from_slice(&recipient_pub);
        let message_key = derive_message_key(shared.as_bytes(), &info)?;

        let plaintext = Zeroizing::new(serde_json::to_vec(literal).map_err(|e| {
            CryptoError::Encryption {
                reason: format!("literal serialization failed: {e}"),
            }
        })?);
        let aad = header_aad(recipient.as_str(), &ephemeral_pub);
        let sealed = aead::seal(message_key.as_bytes(), &plaintext, &aad)?;

        let packet = MessagePacket {
            version: PACKET_VERSION,
            recipient: recipient.as_str().to_string(),
            ephemeral_key: hex::encode(ephemeral_pub),
            nonce: hex::encode(sealed.nonce),
            ciphertext: hex::encode(&sealed.ciphertext),
        };
        tracing::debug!(recipient = %recipient, "message encrypted");
        Ok(EncryptedMessage::new(encode(ArmorKind::Message, &packet)?))
    }

    fn decrypt_literal(&self, message: &EncryptedMessage, key: &SecretKey) -> Result<LiteralPacket> {
        let packet: MessagePacket = decode(ArmorKind::Message, message.as_str())?;
        check_version(packet.version)?;

        let own = key.fingerprint();
        if packet.recipient != own.as_str() {
            return Err(CryptoError::Decryption {
                reason: format!("message is addressed to {}", packet.recipient),
            });
        }

        let ephemeral_pub = decode_fixed::<32>(&packet.ephemeral_key, "ephemeral key")?;
        let sealed = Sealed {
            nonce: decode_fixed::<NONCE_LEN>(&packet.nonce, "nonce")?,
            ciphertext: decode_hex(&packet.ciphertext, "ciphertext")?,
        };

        let secret = key.encryption_secret();
        let shared = secret.agree(&ephemeral_pub);
        let mut info = Vec::with_capacity(64);
        info.extend_from_slice(&ephemeral_pub);
        info.extend_from_slice(&secret.public_key());
        let message_key = derive_message_key(shared.as_bytes(), &info)?;

        let aad = header_aad(&packet.recipient, &ephemeral_pub);
        let plaintext = Zeroizing::new(aead::open(message_key.as_bytes(), &sealed, &aad)?);
        serde_json::from_slice(&plaintext).map_err(|e| CryptoError::Decryption {
            reason: format!("malformed literal packet: {e}"),
        })
    }

    /// Tries each key in order; the first that opens the message wins.
    fn open_with_any(&self, message: &EncryptedMessage, keys: &[&UnlockedKey]) -> Result<LiteralPacket> {
        let mut last_error = None;
        for (index, handle) in keys.iter().enumerate() {
            let Some(key) = SecretKey::from_unlocked(handle) else {
                tracing::debug!(index, "skipping malformed unlocked key");
                continue;
            };
            match self.decrypt_literal(message, &key) {
                Ok(literal) => return Ok(literal),
                Err(e) => {
                    tracing::debug!(index, error = %e, "key did not open message");
                    last_error = Some(e);
                }
            }
        }
        Err(match last_error {
            Some(e) => decryption_error(e),
            None => CryptoError::Decryption {
                reason: "no usable decryption key supplied".into(),
            },
        })
    }

    fn make_signature(&self, key: &SecretKey, format: LiteralFormat, payload: &[u8]) -> SignaturePacket {
        let created_at = now();
        let signature = key.keypair().sign(&signed_bytes(format, created_at, payload));
        SignaturePacket {
            version: PACKET_VERSION,
            issuer: key.fingerprint().as_str().to_string(),
            created_at,
            format,
            signature: hex::encode(signature),
        }
    }

    fn verify_packet(
        &self,
        signature: &SignaturePacket,
        format: LiteralFormat,
        payload: &[u8],
        public: &PublicKeyPacket,
        valid_at: UnixTime,
    ) -> bool {
        if signature.version != PACKET_VERSION || signature.format != format {
            return false;
        }
        match public.fingerprint() {
            Ok(fpr) if fpr.as_str() == signature.issuer => {}
            _ => return false,
        }
        if valid_at != 0 {
            let horizon = valid_at.saturating_add(self.config.max_clock_skew_secs);
            if signature.created_at > horizon || public.created_at > horizon {
                return false;
            }
        }
        let (Ok(verifying_key), Ok(sig)) = (
            public.signing_key_bytes(),
            decode_fixed::<SIGNATURE_LEN>(&signature.signature, "signature"),
        ) else {
            return false;
        };
        signing::verify(
            &verifying_key,
            &signed_bytes(format, signature.created_at, payload),
            &sig,
        )
    }

    fn verify_detached(
        &self,
        format: LiteralFormat,
        payload: &[u8],
        signature: &Signature,
        public_key: &str,
        valid_at: UnixTime,
    ) -> bool {
        let Ok(packet) = decode::<SignaturePacket>(ArmorKind::Signature, signature.as_str()) else {
            return false;
        };
        let Ok(public) = load_public(public_key) else {
            return false;
        };
        self.verify_packet(&packet, format, payload, &public, valid_at)
    }

    fn embedded_status(
        &self,
        literal: &LiteralPacket,
        payload: &[u8],
        verifiers: &[Armored],
        valid_at: UnixTime,
    ) -> VerificationStatus {
        let Some(signature) = &literal.signature else {
            return VerificationStatus::NotSigned;
        };
        if verifiers.is_empty() {
            return VerificationStatus::NoVerifier;
        }
        let verified = verifiers.iter().any(|armored| {
            load_public(armored)
                .map(|public| {
                    self.verify_packet(signature, literal.format, payload, &public, valid_at)
                })
                .unwrap_or(false)
        });
        if verified {
            VerificationStatus::Success
        } else {
            VerificationStatus::Failure
        }
    }

    fn encrypt_payload(
        &self,
        format: LiteralFormat,
        payload: &[u8],
        public_key: &str,
        signer: Option<&SecretKey>,
    ) -> Result<EncryptedMessage> {
        let literal = LiteralPacket {
            format,
            data: hex::encode(payload),
            signature: signer.map(|key| self.make_signature(key, format, payload)),
        };
        self.encrypt_literal(&literal, public_key)
            .map_err(encryption_error)
    }

    fn decrypt_payload(&self, message: &EncryptedMessage, key: &UnlockedKey) -> Result<Vec<u8>> {
        let literal = self.open_with_any(message, &[key])?;
        decode_hex(&literal.data, "literal data").map_err(decryption_error)
    }
}

impl Default for EnvelopeProvider {
    fn default() -> Self {
        Self {
            config: KeyholderConfig::default(),
        }
    }
}

impl CryptoProvider for EnvelopeProvider {
    fn generate_key(&self, user_id: &str, passphrase: Option<&[u8]>) -> Result<Armored> {
        let key = SecretKey {
            seed: Keypair::generate_seed()?,
            created_at: now(),
            user_id: user_id.to_string(),
        };
        let armored = self.seal_private(&key, passphrase)?;
        tracing::debug!(fingerprint = %key.fingerprint(), locked = passphrase.is_some(), "generated key");
        Ok(armored)
    }

    fn unlock(&self, private_key: &str, passphrase: Option<&[u8]>) -> Result<UnlockedKey> {
        self.open_private(private_key, passphrase)
            .map(|key| key.to_unlocked())
            .map_err(unlock_error)
    }

    fn lock(&self, key: &UnlockedKey, passphrase: Option<&[u8]>) -> Result<Armored> {
        let key = SecretKey::from_unlocked(key).ok_or_else(|| CryptoError::Encryption {
            reason: "unlocked key handle is malformed".into(),
        })?;
        self.seal_private(&key, passphrase).map_err(encryption_error)
    }

    fn public_key(&self, private_key: &str) -> Result<Armored> {
        let derive = || -> Result<Armored> {
            let packet: PrivateKeyPacket = decode(ArmorKind::PrivateKey, private_key)?;
            check_version(packet.public.version)?;
            // Rejects packets whose key fields do not decode.
            packet.public.fingerprint()?;
            encode(ArmorKind::PublicKey, &packet.public)
        };
        derive().map_err(|e| CryptoError::KeyDerivation {
            reason: e.to_string(),
        })
    }

    fn fingerprint(&self, key: &str) -> Result<Fingerprint> {
        load_public(key)?.fingerprint()
    }

    fn encrypt_text(&self, text: &str, public_key: &str) -> Result<EncryptedMessage> {
        let payload = to_crlf(text);
        self.encrypt_payload(LiteralFormat::Text, payload.as_bytes(), public_key, None)
    }

    fn encrypt_data(&self, data: &[u8], public_key: &str) -> Result<EncryptedMessage> {
        self.encrypt_payload(LiteralFormat::Binary, data, public_key, None)
    }

    fn decrypt_text(&self, message: &EncryptedMessage, key: &UnlockedKey) -> Result<String> {
        let data = self.decrypt_payload(message, key)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn decrypt_data(&self, message: &EncryptedMessage, key: &UnlockedKey) -> Result<Vec<u8>> {
        self.decrypt_payload(message, key)
    }

    fn sign_text(&self, text: &str, key: &UnlockedKey) -> Result<Signature> {
        let key = signer(key)?;
        let packet = self.make_signature(&key, LiteralFormat::Text, to_crlf(text).as_bytes());
        Ok(Signature::new(encode(ArmorKind::Signature, &packet)?))
    }

    fn sign_data(&self, data: &[u8], key: &UnlockedKey) -> Result<Signature> {
        let key = signer(key)?;
        let packet = self.make_signature(&key, LiteralFormat::Binary, data);
        Ok(Signature::new(encode(ArmorKind::Signature, &packet)?))
    }

    fn verify_text(
        &self,
        text: &str,
        signature: &Signature,
        public_key: &str,
        valid_at: UnixTime,
    ) -> bool {
        let payload = to_crlf(text);
        self.verify_detached(LiteralFormat::Text, payload.as_bytes(), signature, public_key, valid_at)
    }

    fn verify_data(
        &self,
        data: &[u8],
        signature: &Signature,
        public_key: &str,
        valid_at: UnixTime,
    ) -> bool {
        self.verify_detached(LiteralFormat::Binary, data, signature, public_key, valid_at)
    }

    fn encrypt_and_sign_text(
        &self,
        text: &str,
        public_key: &str,
        signer_key: &UnlockedKey,
    ) -> Result<EncryptedMessage> {
        let key = signer(signer_key)?;
        let payload = to_crlf(text);
        self.encrypt_payload(LiteralFormat::Text, payload.as_bytes(), public_key, Some(&key))
    }

    fn encrypt_and_sign_data(
        &self,
        data: &[u8],
        public_key: &str,
        signer_key: &UnlockedKey,
    ) -> Result<EncryptedMessage> {
        let key = signer(signer_key)?;
        self.encrypt_payload(LiteralFormat::Binary, data, public_key, Some(&key))
    }

    fn decrypt_and_verify_text(
        &self,
        message: &EncryptedMessage,
        verifiers: &[Armored],
        keys: &[&UnlockedKey],
        valid_at: UnixTime,
    ) -> Result<DecryptedText> {
        let literal = self.open_with_any(message, keys)?;
        let data = Zeroizing::new(
            decode_hex(&literal.data, "literal data").map_err(decryption_error)?,
        );
        let status = self.embedded_status(&literal, &data, verifiers, valid_at);
        Ok(DecryptedText {
            text: String::from_utf8_lossy(&data).into_owned(),
            status,
        })
    }

    fn decrypt_and_verify_data(
        &self,
        message: &EncryptedMessage,
        verifiers: &[Armored],
        keys: &[&UnlockedKey],
        valid_at: UnixTime,
    ) -> Result<DecryptedData> {
        let literal = self.open_with_any(message, keys)?;
        let data = decode_hex(&literal.data, "literal data").map_err(decryption_error)?;
        let status = self.embedded_status(&literal, &data, verifiers, valid_at);
        Ok(DecryptedData { data, status })
    }

    fn derive_passphrase(&self, password: &[u8], encoded_salt: &str) -> Result<UnlockedSecret> {
        let salt = STANDARD
            .decode(encoded_salt.trim())
            .map_err(|e| CryptoError::InvalidFormat {
                reason: format!("salt is not valid base64: {e}"),
            })?;
        let key = argon2id_derive_key(password, &salt, &self.config.passphrase_kdf)?;
        Ok(UnlockedSecret::new(hex::encode(key.as_bytes()).into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_provider() -> EnvelopeProvider {
        let light = KdfParams {
            m_cost: 256,
            t_cost: 1,
            p_cost: 1,
        };
        EnvelopeProvider::new(KeyholderConfig {
            key_lock_kdf: light,
            passphrase_kdf: light,
            max_clock_skew_secs: 0,
        })
        .unwrap()
    }

    #[test]
    fn unlocked_handle_roundtrip() {
        let key = SecretKey {
            seed: Zeroizing::new([0x42; SEED_LEN]),
            created_at: 1_700_000_000,
            user_id: "bob".into(),
        };
        let handle = key.to_unlocked();
        let parsed = SecretKey::from_unlocked(&handle).unwrap();
        assert_eq!(&parsed.seed[..], &key.seed[..]);
        assert_eq!(parsed.created_at, key.created_at);
        assert_eq!(parsed.user_id, "bob");
    }

    #[test]
    fn foreign_handle_rejected() {
        assert!(SecretKey::from_unlocked(&UnlockedKey::new(vec![0u8; 64])).is_none());
        assert!(SecretKey::from_unlocked(&UnlockedKey::new(b"KHU1".to_vec())).is_none());
    }

    #[test]
    fn crlf_conversion_is_idempotent() {
        assert_eq!(to_crlf("a\nb\r\nc"), "a\r\nb\r\nc");
        assert_eq!(to_crlf(&to_crlf("a\nb")), "a\r\nb");
    }

    #[test]
    fn clear_key_unlocks_without_passphrase() -> std::result::Result<(), CryptoError> {
        let provider = light_provider();
        let private = provider.generate_key("alice", None)?;
        assert!(provider.unlock(&private, None).is_ok());
        Ok(())
    }

    #[test]
    fn locked_key_requires_right_passphrase() -> std::result::Result<(), CryptoError> {
        let provider = light_provider();
        let private = provider.generate_key("alice", Some(b"hunter2"))?;
        assert!(matches!(provider.unlock(&private, None), Err(CryptoError::Unlock { .. })));
        assert!(matches!(
            provider.unlock(&private, Some(b"wrong")),
            Err(CryptoError::Unlock { .. })
        ));
        assert!(provider.unlock(&private, Some(b"hunter2")).is_ok());
        Ok(())
    }

    #[test]
    fn relock_keeps_fingerprint() -> std::result::Result<(), CryptoError> {
        let provider = light_provider();
        let private = provider.generate_key("alice", Some(b"old"))?;
        let unlocked = provider.unlock(&private, Some(b"old"))?;
        let relocked = provider.lock(&unlocked, Some(b"new"))?;
        assert_eq!(provider.fingerprint(&private)?, provider.fingerprint(&relocked)?);
        assert!(provider.unlock(&relocked, Some(b"new")).is_ok());
        assert!(provider.unlock(&relocked, Some(b"old")).is_err());
        Ok(())
    }

    #[test]
    fn signature_time_window() -> std::result::Result<(), CryptoError> {
        let provider = light_provider();
        let private = provider.generate_key("alice", None)?;
        let public = provider.public_key(&private)?;
        let key = provider.unlock(&private, None)?;
        let sig = provider.sign_data(b"payload", &key)?;

        assert!(provider.verify_data(b"payload", &sig, &public, 0));
        assert!(provider.verify_data(b"payload", &sig, &public, now() + 60));
        // A signature cannot be valid before the key existed.
        assert!(!provider.verify_data(b"payload", &sig, &public, 1));
        Ok(())
    }

    #[test]
    fn text_signature_ignores_line_endings() -> std::result::Result<(), CryptoError> {
        let provider = light_provider();
        let private = provider.generate_key("alice", None)?;
        let public = provider.public_key(&private)?;
        let key = provider.unlock(&private, None)?;
        let sig = provider.sign_text("one\ntwo\n", &key)?;
        assert!(provider.verify_text("one\r\ntwo\r\n", &sig, &public, 0));
        assert!(!provider.verify_data(b"one\ntwo\n", &sig, &public, 0));
        Ok(())
    }

    #[test]
    fn derive_passphrase_rejects_bad_salt() {
        let provider = light_provider();
        assert!(matches!(
            provider.derive_passphrase(b"pw", "***"),
            Err(CryptoError::InvalidFormat { .. })
        ));
        assert!(matches!(
            provider.derive_passphrase(b"pw", "AAAA"),
            Err(CryptoError::Config { .. })
        ));
    }
}
