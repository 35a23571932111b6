//! Errors from credential resolution and the local credential store.

use searchad_api::{CredentialField, CredentialSource};
use thiserror::Error;

/// Errors from resolving or storing credentials.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No tier supplied all three fields.
    #[error("Missing credential fields: {} (checked: {})", join(.missing), join(.checked))]
    Missing {
        missing: Vec<CredentialField>,
        checked: Vec<CredentialSource>,
    },
    /// A store exists but could not be read, decoded, or decrypted.
    #[error("Credential store {source_tier} is corrupt: {reason}")]
    StoreCorrupt {
        source_tier: CredentialSource,
        reason: String,
    },
    /// Refused to save a credential with empty fields.
    #[error("Cannot save credential, missing: {}", join(.0))]
    Incomplete(Vec<CredentialField>),
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
