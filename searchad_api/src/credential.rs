//! Signing material for the Search Ad API.

use std::fmt::{self, Debug, Formatter};

/// The three secrets a signed call needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialField {
    AccountId,
    ApiKey,
    SigningKey,
}

impl CredentialField {
    pub const ALL: [CredentialField; 3] = [
        CredentialField::AccountId,
        CredentialField::ApiKey,
        CredentialField::SigningKey,
    ];

    /// Name used in error messages and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            CredentialField::AccountId => "customer_id",
            CredentialField::ApiKey => "api_key",
            CredentialField::SigningKey => "secret_key",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which resolution tier produced a credential. Diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CredentialSource {
    /// A value handed in by the running session (CLI flags, user input).
    #[default]
    Override,
    /// A managed secret store outside the process.
    SecretStore,
    /// Process environment variables.
    Environment,
    /// The encrypted local credentials file.
    EncryptedFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialSource::Override => "override",
            CredentialSource::SecretStore => "secret-store",
            CredentialSource::Environment => "environment",
            CredentialSource::EncryptedFile => "encrypted-file",
        };
        f.write_str(s)
    }
}

/// A credential with one or more empty fields.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("credential is missing {}", join_fields(.missing))]
pub struct IncompleteCredential {
    pub missing: Vec<CredentialField>,
}

fn join_fields(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(|f| f.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Complete signing material. All three fields are guaranteed non-empty.
///
/// `Debug` never prints the secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    account_id: String,
    api_key: String,
    signing_key: String,
    source: CredentialSource,
}

impl Credential {
    /// Builds a credential, trimming each field. Fails listing every field
    /// that is empty after trimming.
    pub fn new(
        account_id: &str,
        api_key: &str,
        signing_key: &str,
        source: CredentialSource,
    ) -> Result<Self, IncompleteCredential> {
        let account_id = account_id.trim();
        let api_key = api_key.trim();
        let signing_key = signing_key.trim();

        let missing: Vec<CredentialField> = [
            (CredentialField::AccountId, account_id),
            (CredentialField::ApiKey, api_key),
            (CredentialField::SigningKey, signing_key),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(f, _)| f)
        .collect();

        if !missing.is_empty() {
            return Err(IncompleteCredential { missing });
        }

        Ok(Self {
            account_id: account_id.to_string(),
            api_key: api_key.to_string(),
            signing_key: signing_key.to_string(),
            source,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn signing_key(&self) -> &str {
        &self.signing_key
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account_id", &redact(&self.account_id))
            .field("api_key", &redact(&self.api_key))
            .field("signing_key", &redact(&self.signing_key))
            .field("source", &self.source)
            .finish()
    }
}

fn redact(v: &str) -> &str {
    if v.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
