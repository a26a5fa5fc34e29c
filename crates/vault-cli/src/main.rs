//! Password Vault CLI
//!
//! Every invocation opens the vault in the data directory. Commands that need
//! the records first try the key material cached by the last unlock and only
//! ask for the master password when there is none; `logout` removes it.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use commands::{Command, Context};
use vault_core::{FileStore, KeychainStore};

/// Password Vault - credentials encrypted under a single master password
#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(version)]
#[command(about = "Password Vault - credentials encrypted under a single master password")]
struct Args {
    /// Directory holding the vault and its settings
    #[arg(long, env = "VAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Master password (prompted for when needed and not given)
    #[arg(long, env = "VAULT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Keep the cached session key in the OS keychain
    #[arg(long, env = "VAULT_KEYCHAIN")]
    keychain: bool,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so command output stays pipeable
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => FileStore::default_dir()?,
    };

    let mut context = Context::new(data_dir, args.password);
    if args.keychain {
        context = context.with_key_store(Arc::new(KeychainStore::connect(None)?));
    }
    let mut stdout = std::io::stdout();

    commands::run(args.command, &context, &mut stdout).await
}
