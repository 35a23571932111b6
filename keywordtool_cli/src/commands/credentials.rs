//! Credential management: save to the encrypted file, inspect tiers, clear.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use keywordtool_lib::{
    validation, CredentialFields, CredentialResolver, EncryptedFileStore, OverrideSource,
};

use crate::output::{print_tiers, OutputFormat};

#[derive(Args)]
pub struct CredentialsArgs {
    #[command(subcommand)]
    pub action: CredentialsAction,
}

#[derive(Subcommand)]
pub enum CredentialsAction {
    /// Encrypt and save credentials to the local credentials file
    Save {
        /// Customer ID
        #[arg(long)]
        customer_id: String,

        /// API key
        #[arg(long)]
        api_key: String,

        /// Secret key
        #[arg(long)]
        secret_key: String,
    },
    /// Show which tiers supply credentials and which one wins
    Check,
    /// Delete the saved credentials file and its master key
    Clear,
}

pub async fn run(args: &CredentialsArgs, format: &OutputFormat) -> Result<()> {
    match &args.action {
        CredentialsAction::Save {
            customer_id,
            api_key,
            secret_key,
        } => save(customer_id, api_key, secret_key),
        CredentialsAction::Check => check(format),
        CredentialsAction::Clear => clear(),
    }
}

fn save(customer_id: &str, api_key: &str, secret_key: &str) -> Result<()> {
    let customer_id = validation::sanitize_text(customer_id, validation::MAX_KEYWORD_LENGTH)?;
    let fields = CredentialFields::new(&customer_id, api_key, secret_key);
    let store = EncryptedFileStore::from_env();
    store.save(&fields)?;
    eprintln!("Credentials saved to {}", store.path().display());
    Ok(())
}

fn check(format: &OutputFormat) -> Result<()> {
    let resolver = CredentialResolver::standard(OverrideSource::default());
    print_tiers(&resolver.describe(), format)?;

    match resolver.resolve() {
        Ok(credential) => {
            eprintln!("Resolved from: {}", credential.source());
            Ok(())
        }
        Err(e) => bail!("{}", e),
    }
}

fn clear() -> Result<()> {
    let store = EncryptedFileStore::from_env();
    if store.clear()? {
        eprintln!("Removed {}", store.path().display());
    } else {
        eprintln!("No saved credentials at {}", store.path().display());
    }
    Ok(())
}
