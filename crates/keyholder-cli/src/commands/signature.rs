//! `keyholder sign` and `keyholder verify`.

use std::path::PathBuf;

use clap::Args;
use keyholder_keys::use_keys;
use keyholder_types::{Signature, UnixTime};

use super::{crypto_err, read_input, read_public_key_ring, read_text, write_output};
use crate::holder_io;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct SignArgs {
    /// Sign the input as bytes rather than text.
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
pub struct VerifyArgs {
    /// Armored signature file.
    #[arg(long, value_name = "FILE")]
    signature: PathBuf,

    /// Signer's public key file. Defaults to the holder's own keys.
    #[arg(long = "with", value_name = "FILE")]
    with_key: Option<PathBuf>,

    /// Unix time the signature must be valid at (0 skips the check).
    #[arg(long, default_value_t = 0)]
    at: UnixTime,

    /// Verify the input as bytes rather than text.
    #[arg(long)]
    binary: bool,

    /// Input file (stdin if omitted).
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,
}

pub fn sign(args: SignArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let holder = holder_io::load_holder(&opts.holder)?;

    let signature = if args.binary {
        let data = read_input(args.input.as_deref())?;
        use_keys(&holder, &ctx, |session| session.sign_data(&data))
    } else {
        let text = read_text(args.input.as_deref())?;
        use_keys(&holder, &ctx, |session| session.sign_text(&text))
    }
    .map_err(crypto_err)?;

    if opts.json {
        output::print_kv("signature", signature.as_str(), true);
        return Ok(());
    }
    write_output(args.output.as_deref(), signature.as_str().as_bytes())
}

pub fn verify(args: VerifyArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let signature = Signature::new(
        std::fs::read_to_string(&args.signature)
            .map_err(|e| format!("failed to read {}: {e}", args.signature.display()))?,
    );
    let input = read_input(args.input.as_deref())?;

    let valid = match &args.with_key {
        Some(path) => {
            let ring = read_public_key_ring(path)?;
            if args.binary {
                ring.verify_data(&ctx, &input, &signature, args.at)
            } else {
                let text = String::from_utf8(input)
                    .map_err(|_| "input is not valid UTF-8 (use --binary)".to_string())?;
                ring.verify_text(&ctx, &text, &signature, args.at)
            }
        }
        None => {
            let holder = holder_io::load_holder(&opts.holder)?;
            use_keys(&holder, &ctx, |session| {
                Ok::<_, keyholder_types::CryptoError>(if args.binary {
                    session.verify_data(&input, &signature, args.at)
                } else {
                    session.verify_text(&String::from_utf8_lossy(&input), &signature, args.at)
                })
            })
            .map_err(crypto_err)?
        }
    };

    if opts.json {
        println!("{}", serde_json::json!({ "valid": valid }));
    } else if valid {
        output::print_success("signature is valid", false);
    }
    if !valid {
        return Err("signature verification failed".into());
    }
    Ok(())
}
