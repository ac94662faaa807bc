//! ASCII armor for keys, messages and signatures.
//!
//! ```text
//! -----BEGIN KEYHOLDER MESSAGE-----
//! <base64 body, 64 columns>
//! =<base64 of the first 4 bytes of SHA3-256(body)>
//! -----END KEYHOLDER MESSAGE-----
//! ```
//!
//! The checksum line catches copy/paste damage before a packet parser
//! ever sees the bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use keyholder_types::{CryptoError, Result};

use crate::hash::sha3_256;

const LINE_WIDTH: usize = 64;
const CHECKSUM_LEN: usize = 4;

/// What an armored block contains.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArmorKind {
    /// Public key packet.
    PublicKey,
    /// Private key packet (seed locked or in clear).
    PrivateKey,
    /// Encrypted message.
    Message,
    /// Detached signature.
    Signature,
}

impl ArmorKind {
    fn label(self) -> &'static str {
        match self {
            Self::PublicKey => "PUBLIC KEY",
            Self::PrivateKey => "PRIVATE KEY",
            Self::Message => "MESSAGE",
            Self::Signature => "SIGNATURE",
        }
    }

    fn begin(self) -> String {
        format!("-----BEGIN KEYHOLDER {}-----", self.label())
    }

    fn end(self) -> String {
        format!("-----END KEYHOLDER {}-----", self.label())
    }
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha3_256(body);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Wraps `body` in an armored block.
pub fn armor(kind: ArmorKind, body: &[u8]) -> String {
    let encoded = STANDARD.encode(body);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 96);
    out.push_str(&kind.begin());
    out.push('\n');
    for chunk in encoded.as_bytes().chunks(LINE_WIDTH) {
        // Base64 output is ASCII, so every chunk is valid UTF-8.
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push('=');
    out.push_str(&STANDARD.encode(checksum(body)));
    out.push('\n');
    out.push_str(&kind.end());
    out.push('\n');
    out
}

/// Strips the armor from `text` and returns the verified body.
///
/// # Errors
///
/// [`CryptoError::InvalidFormat`] if the header or footer does not
/// match `kind`, the base64 is malformed, or the checksum is missing or
/// wrong.
pub fn dearmor(kind: ArmorKind, text: &str) -> Result<Vec<u8>> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if lines.next() != Some(kind.begin().as_str()) {
        return Err(invalid(format!("missing {} header", kind.label())));
    }

    let mut body_b64 = String::new();
    let mut checksum_b64: Option<&str> = None;
    let mut terminated = false;

    for line in lines {
        if line == kind.end() {
            terminated = true;
            break;
        }
        if checksum_b64.is_some() {
            return Err(invalid("data after checksum line".into()));
        }
        match line.strip_prefix('=') {
            Some(sum) => checksum_b64 = Some(sum),
            None => body_b64.push_str(line),
        }
    }

    if !terminated {
        return Err(invalid(format!("missing {} footer", kind.label())));
    }

    let body = STANDARD
        .decode(body_b64.as_bytes())
        .map_err(|e| invalid(format!("bad base64 body: {e}")))?;

    let sum = checksum_b64.ok_or_else(|| invalid("missing checksum line".into()))?;
    let expected = STANDARD
        .decode(sum.as_bytes())
        .map_err(|e| invalid(format!("bad base64 checksum: {e}")))?;

    if expected.as_slice() != checksum(&body).as_slice() {
        return Err(invalid("armor checksum mismatch".into()));
    }

    Ok(body)
}

fn invalid(reason: String) -> CryptoError {
    CryptoError::InvalidFormat { reason }
}
