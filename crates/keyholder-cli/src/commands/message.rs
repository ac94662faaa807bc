//! `keyholder encrypt` and `keyholder decrypt`.

use std::path::PathBuf;

use clap::Args;
use keyholder_keys::{use_keys, PublicKeyRing};
use keyholder_types::{CryptoError, EncryptedMessage, UnixTime, VerificationStatus};

use super::{crypto_err, read_input, read_public_key_ring, read_text, write_output};
use crate::holder_io;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct EncryptArgs {
    /// Recipient public key file. Defaults to the holder's own key.
    #[arg(long, value_name = "FILE")]
    to: Option<PathBuf>,

    /// Embed a signature by the holder's primary key.
    #[arg(long)]
    sign: bool,

    /// Treat the input as bytes; line endings are kept exactly.
    #[arg(long)]
    binary: bool,

    /// Input file (stdin if omitted).
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted).
    #[arg(long = "out", value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Args)]
pub struct DecryptArgs {
    /// Check the embedded signature against this public key file.
    #[arg(long, value_name = "FILE")]
    verify_with: Option<PathBuf>,

    /// Unix time the signature must be valid at (0 skips the check).
    #[arg(long, default_value_t = 0)]
    at: UnixTime,

    /// Write the payload bytes exactly as sent.
    #[arg(long)]
    binary: bool,

    /// Input file (stdin if omitted).
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted).
    #[arg(long = "out", value_name = "FILE")]
    output: Option<PathBuf>,
}

/// Plaintext handed to the encryption session.
enum Payload {
    Text(String),
    Data(Vec<u8>),
}

pub fn encrypt(args: EncryptArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let holder = holder_io::load_holder(&opts.holder)?;
    let recipient = args.to.as_deref().map(read_public_key_ring).transpose()?;
    let payload = if args.binary {
        Payload::Data(read_input(args.input.as_deref())?)
    } else {
        Payload::Text(read_text(args.input.as_deref())?)
    };

    let message = use_keys(&holder, &ctx, |session| {
        let ring = recipient.as_ref().unwrap_or(session.public_key_ring());
        match (&payload, args.sign) {
            (Payload::Text(text), true) => session.encrypt_and_sign_text(text, ring),
            (Payload::Data(data), true) => session.encrypt_and_sign_data(data, ring),
            (Payload::Text(text), false) => ring.encrypt_text(session.context(), text),
            (Payload::Data(data), false) => ring.encrypt_data(session.context(), data),
        }
    })
    .map_err(crypto_err)?;

    if opts.json {
        output::print_kv("message", message.as_str(), true);
        return Ok(());
    }
    write_output(args.output.as_deref(), message.as_str().as_bytes())
}

/// Decrypted payload plus the signature check, if one was requested.
struct Opened {
    bytes: Vec<u8>,
    status: Option<VerificationStatus>,
}

pub fn decrypt(args: DecryptArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let holder = holder_io::load_holder(&opts.holder)?;
    let verifiers: Option<PublicKeyRing> =
        args.verify_with.as_deref().map(read_public_key_ring).transpose()?;
    let message = EncryptedMessage::new(read_text(args.input.as_deref())?);

    let opened = use_keys(&holder, &ctx, |session| {
        let opened = match (&verifiers, args.binary) {
            (Some(ring), true) => {
                let out = session.decrypt_and_verify_data(&message, ring, args.at)?;
                Opened {
                    bytes: out.data,
                    status: Some(out.status),
                }
            }
            (Some(ring), false) => {
                let out = session.decrypt_and_verify_text(&message, ring, args.at)?;
                Opened {
                    bytes: out.text.into_bytes(),
                    status: Some(out.status),
                }
            }
            (None, true) => Opened {
                bytes: session.decrypt_data(&message)?,
                status: None,
            },
            (None, false) => Opened {
                bytes: session.decrypt_text(&message)?.into_bytes(),
                status: None,
            },
        };
        Ok::<_, CryptoError>(opened)
    })
    .map_err(crypto_err)?;

    if opts.json {
        let mut obj = serde_json::Map::new();
        if args.binary {
            obj.insert("data_hex".into(), hex::encode(&opened.bytes).into());
        } else {
            obj.insert(
                "text".into(),
                String::from_utf8_lossy(&opened.bytes).into_owned().into(),
            );
        }
        if let Some(status) = opened.status {
            obj.insert("signature".into(), status.to_string().into());
        }
        output::print_json_value(&serde_json::Value::Object(obj), true);
        return Ok(());
    }

    write_output(args.output.as_deref(), &opened.bytes)?;
    if let Some(status) = opened.status {
        output::print_status(status);
    }
    Ok(())
}
