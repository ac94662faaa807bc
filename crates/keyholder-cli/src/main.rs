//! Keyholder CLI.
//!
//! Manages a holder file of private keys and runs encryption, signing
//! and passphrase operations against it.

mod commands;
mod holder_io;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use keyholder_crypto::{AeadKeyStore, KeyStoreCrypto};
use keyholder_keys::CryptoContext;
use keyholder_types::config::KeyholderConfig;
use keyholder_types::{CryptoError, EncryptedSecret, UnlockedSecret};

/// Environment variable holding the hex key-store master key.
const MASTER_KEY_ENV: &str = "KEYHOLDER_MASTER_KEY";

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Keyholder: keys, envelopes and signatures for one key holder.
#[derive(Parser)]
#[command(name = "keyholder", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Holder file with the private keys.
    #[arg(long, global = true, default_value = "keyholder.json")]
    holder: PathBuf,

    /// Provider configuration file (JSON). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Hex master key sealing stored passphrases. Falls back to
    /// $KEYHOLDER_MASTER_KEY.
    #[arg(long, global = true)]
    master_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a private key and add it to the holder file.
    Keygen(commands::keygen::KeygenArgs),
    /// List the holder's public keys or export the primary one.
    Pubkey(commands::keys::PubkeyArgs),
    /// Encrypt (and optionally sign) a message.
    Encrypt(commands::message::EncryptArgs),
    /// Decrypt (and optionally verify) a message.
    Decrypt(commands::message::DecryptArgs),
    /// Produce a detached signature with the primary key.
    Sign(commands::signature::SignArgs),
    /// Check a detached signature.
    Verify(commands::signature::VerifyArgs),
    /// Derive a key passphrase from a login password.
    Passphrase(commands::passphrase::PassphraseArgs),
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub holder: PathBuf,
    pub config: KeyholderConfig,
    pub master_key: Option<String>,
}

impl GlobalOpts {
    /// Builds the crypto context for this invocation.
    pub fn context(&self) -> Result<CryptoContext, String> {
        let key_store: Arc<dyn KeyStoreCrypto> = match &self.master_key {
            Some(hex) => Arc::new(AeadKeyStore::from_hex(hex).map_err(|e| e.to_string())?),
            None => Arc::new(NoKeyStore),
        };
        CryptoContext::with_envelope(self.config.clone(), key_store).map_err(|e| e.to_string())
    }
}

/// Key store used when no master key is configured. Keys stored in
/// clear keep working; anything touching a stored passphrase fails.
struct NoKeyStore;

impl NoKeyStore {
    fn missing() -> CryptoError {
        CryptoError::KeyStore {
            reason: format!("no master key configured (pass --master-key or set {MASTER_KEY_ENV})"),
        }
    }
}

impl KeyStoreCrypto for NoKeyStore {
    fn encrypt(&self, _secret: &UnlockedSecret) -> keyholder_types::Result<EncryptedSecret> {
        Err(Self::missing())
    }

    fn decrypt(&self, _secret: &EncryptedSecret) -> keyholder_types::Result<UnlockedSecret> {
        Err(Self::missing())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let result = build_opts(cli.json, cli.holder, cli.config, cli.master_key)
        .and_then(|opts| dispatch(&opts, cli.command));

    if let Err(e) = result {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}

fn build_opts(
    json: bool,
    holder: PathBuf,
    config: Option<PathBuf>,
    master_key: Option<String>,
) -> Result<GlobalOpts, String> {
    let config = match config {
        Some(path) => KeyholderConfig::load(&path).map_err(|e| e.to_string())?,
        None => KeyholderConfig::default(),
    };
    let master_key = master_key.or_else(|| std::env::var(MASTER_KEY_ENV).ok());
    Ok(GlobalOpts {
        json,
        holder,
        config,
        master_key,
    })
}

fn dispatch(opts: &GlobalOpts, cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Keygen(args) => commands::keygen::run(args, opts),
        Commands::Pubkey(args) => commands::keys::run(args, opts),
        Commands::Encrypt(args) => commands::message::encrypt(args, opts),
        Commands::Decrypt(args) => commands::message::decrypt(args, opts),
        Commands::Sign(args) => commands::signature::sign(args, opts),
        Commands::Verify(args) => commands::signature::verify(args, opts),
        Commands::Passphrase(args) => commands::passphrase::run(args, opts),
    }
}
