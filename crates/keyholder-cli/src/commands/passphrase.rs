//! `keyholder passphrase`.

use clap::Args;
use keyholder_keys::passphrase::attach_stored_passphrase;
use keyholder_keys::{get_passphrase, unlock_with_password, InMemoryPassphraseRepository};

use super::crypto_err;
use crate::holder_io;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct PassphraseArgs {
    /// Login password.
    #[arg(long)]
    password: String,

    /// Base64 salt the passphrase is derived with.
    #[arg(long)]
    salt: String,

    /// Prove the passphrase against the holder's primary key and store
    /// it (sealed) on every key that has none.
    #[arg(long)]
    login: bool,
}

pub fn run(args: PassphraseArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;

    if !args.login {
        let passphrase =
            get_passphrase(&ctx, args.password.as_bytes(), &args.salt).map_err(crypto_err)?;
        let rendered = String::from_utf8_lossy(passphrase.as_bytes());
        output::print_kv("passphrase", &rendered, opts.json);
        return Ok(());
    }

    let mut holder = holder_io::load_holder(&opts.holder)?;
    let repository = InMemoryPassphraseRepository::new();
    unlock_with_password(
        &ctx,
        &repository,
        &holder.user_id,
        &holder.keys,
        args.password.as_bytes(),
        &args.salt,
    )
    .map_err(crypto_err)?;

    holder.keys =
        attach_stored_passphrase(&repository, &holder.user_id, &holder.keys).map_err(crypto_err)?;
    holder_io::save_holder(&opts.holder, &holder)?;

    output::print_success(&format!("passphrase stored for {}", holder.user_id), opts.json);
    Ok(())
}
