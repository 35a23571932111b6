//! Credential resolution: override, managed secret store, environment, then
//! the encrypted local file.

mod encrypted_file;
mod error;
mod resolver;
mod sources;

pub use encrypted_file::{EncryptedFileStore, CREDENTIALS_FILE_ENV, MASTER_KEY_ENV};
pub use error::CredentialError;
pub use resolver::{CredentialResolver, SessionCredential, TierReport, TierStatus};
pub use sources::{
    CredentialFields, CredentialTier, EnvSource, OverrideSource, SecretStoreSource,
    DEFAULT_SECRETS_FILE, ENV_API_KEY, ENV_CUSTOMER_ID, ENV_SECRET_KEY, SECRETS_FILE_ENV,
};
