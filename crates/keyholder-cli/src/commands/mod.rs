//! Command handlers and the I/O helpers they share.

pub mod keygen;
pub mod keys;
pub mod message;
pub mod passphrase;
pub mod signature;

use std::io::{Read, Write};
use std::path::Path;

use keyholder_keys::{PublicKey, PublicKeyRing};
use keyholder_types::CryptoError;

/// Reads the whole input file, or stdin when no path is given.
pub fn read_input(path: Option<&Path>) -> Result<Vec<u8>, String> {
    match path {
        Some(path) => std::fs::read(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            Ok(buf)
        }
    }
}

/// Reads input that must be UTF-8 text.
pub fn read_text(path: Option<&Path>) -> Result<String, String> {
    String::from_utf8(read_input(path)?)
        .map_err(|_| "input is not valid UTF-8 (use --binary)".to_string())
}

/// Writes to the output file, or stdout when no path is given.
pub fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<(), String> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .map_err(|e| format!("failed to write {}: {e}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(|e| format!("failed to write stdout: {e}"))
        }
    }
}

/// Loads an exported public key file as a one-key ring.
pub fn read_public_key_ring(path: &Path) -> Result<PublicKeyRing, String> {
    let armored = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read public key {}: {e}", path.display()))?;
    Ok(PublicKeyRing::new(vec![PublicKey::new(armored).primary(true)]))
}

/// Flattens a crypto error for printing.
pub fn crypto_err(e: CryptoError) -> String {
    e.to_string()
}
