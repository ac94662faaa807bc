//! `keyholder pubkey`.

use clap::Args;
use keyholder_keys::use_keys;
use keyholder_types::CryptoError;

use super::{crypto_err, write_output};
use crate::holder_io;
use crate::output;
use crate::GlobalOpts;

#[derive(Args)]
pub struct PubkeyArgs {
    /// Print the primary public key in armored form instead of listing.
    #[arg(long)]
    export: bool,
}

pub fn run(args: PubkeyArgs, opts: &GlobalOpts) -> Result<(), String> {
    let ctx = opts.context()?;
    let holder = holder_io::load_holder(&opts.holder)?;

    if args.export {
        let armored = use_keys(&holder, &ctx, |session| {
            session
                .public_key_ring()
                .primary_key()
                .map(|key| key.armored.clone())
        })
        .map_err(crypto_err)?;
        if opts.json {
            output::print_kv("public_key", &armored, true);
            return Ok(());
        }
        return write_output(None, armored.as_bytes());
    }

    let rows = use_keys(&holder, &ctx, |session| {
        session
            .public_key_ring()
            .keys()
            .iter()
            .map(|key| {
                let fingerprint = session.context().provider().fingerprint(&key.armored)?;
                Ok::<_, CryptoError>(vec![
                    fingerprint.as_str().to_string(),
                    output::yes_no(key.is_primary),
                    output::yes_no(key.is_active),
                    output::yes_no(key.can_encrypt),
                    output::yes_no(key.can_verify),
                ])
            })
            .collect::<Result<Vec<_>, _>>()
    })
    .map_err(crypto_err)?;

    output::print_table(
        &["fingerprint", "primary", "active", "encrypt", "verify"],
        &rows,
        opts.json,
    );
    Ok(())
}
