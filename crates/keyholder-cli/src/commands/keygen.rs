//! `keyholder keygen`.

use clap::Args;
use keyholder_keys::PrivateKey;
use keyholder_types::UnlockedSecret;

use super::crypto_err;
use crate::holder_io;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct KeygenArgs {
    /// Identity the key belongs to (must match an existing holder file).
    #[arg(long)]
    user: String,

    /// Lock the key with this passphrase. The passphrase is kept in the
    /// holder file, sealed by the key store.
    #[arg(long)]
    passphrase: Option<String>,

    /// Make the new key primary (the first key always is).
    #[arg(long)]
    primary: bool,
}

pub fn run(args: KeygenArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let mut holder = holder_io::load_or_create(&opts.holder, &args.user)?;

    let passphrase = args.passphrase.as_deref().map(UnlockedSecret::from_passphrase);
    let make_primary = args.primary || holder.keys.is_empty();
    let key = PrivateKey::generate(&ctx, &args.user, passphrase.as_ref())
        .map_err(crypto_err)?
        .primary(make_primary);
    let fingerprint = ctx.provider().fingerprint(&key.armored).map_err(crypto_err)?;

    if make_primary {
        for existing in &mut holder.keys {
            existing.is_primary = false;
        }
    }
    holder.keys.push(key);
    holder_io::save_holder(&opts.holder, &holder)?;

    if opts.json {
        let obj = serde_json::json!({
            "status": "ok",
            "fingerprint": fingerprint.as_str(),
            "primary": make_primary,
            "keys": holder.keys.len(),
        });
        println!("{obj}");
    } else {
        output::print_success(&format!("generated key for {}", args.user), false);
        output::print_kv("Fingerprint", fingerprint.as_str(), false);
        output::print_kv("Primary", &output::yes_no(make_primary), false);
    }
    Ok(())
}
