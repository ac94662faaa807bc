//! Newline canonicalization for decrypted text.
//!
//! Providers transmit text with `\r\n` line endings and decode it lossily
//! (invalid UTF-8 becomes U+FFFD). Everything the text paths of a key ring
//! hand back uses `\n`. Byte paths are left alone.

/// Replaces every `\r\n` with `\n`. A lone `\r` is kept.
pub fn canonicalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
}
