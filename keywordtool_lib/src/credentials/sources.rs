//! The credential tiers consulted by [`CredentialResolver`](super::CredentialResolver).

use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};

use searchad_api::{Credential, CredentialField, CredentialSource, IncompleteCredential};
use serde::{Deserialize, Serialize};

use super::CredentialError;

pub const ENV_CUSTOMER_ID: &str = "NAVER_CUSTOMER_ID";
pub const ENV_API_KEY: &str = "NAVER_API_KEY";
pub const ENV_SECRET_KEY: &str = "NAVER_SECRET_KEY";

/// Overrides the managed secrets file location.
pub const SECRETS_FILE_ENV: &str = "KEYWORDTOOL_SECRETS_FILE";
pub const DEFAULT_SECRETS_FILE: &str = "/run/secrets/keywordtool.toml";

/// The three credential fields as a tier holds them, possibly incomplete.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialFields {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub secret_key: String,
}

impl CredentialFields {
    pub fn new(customer_id: &str, api_key: &str, secret_key: &str) -> Self {
        Self {
            customer_id: customer_id.trim().to_string(),
            api_key: api_key.trim().to_string(),
            secret_key: secret_key.trim().to_string(),
        }
    }

    fn from_options(
        customer_id: Option<String>,
        api_key: Option<String>,
        secret_key: Option<String>,
    ) -> Option<Self> {
        if customer_id.is_none() && api_key.is_none() && secret_key.is_none() {
            return None;
        }
        Some(Self::new(
            customer_id.as_deref().unwrap_or_default(),
            api_key.as_deref().unwrap_or_default(),
            secret_key.as_deref().unwrap_or_default(),
        ))
    }

    /// Fields that are empty after trimming.
    pub fn missing(&self) -> Vec<CredentialField> {
        [
            (CredentialField::AccountId, &self.customer_id),
            (CredentialField::ApiKey, &self.api_key),
            (CredentialField::SigningKey, &self.secret_key),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(f, _)| f)
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.missing().len() == CredentialField::ALL.len()
    }

    /// Blanks values left over from the sample secrets template.
    pub fn without_placeholders(mut self) -> Self {
        for value in [
            &mut self.customer_id,
            &mut self.api_key,
            &mut self.secret_key,
        ] {
            if TEMPLATE_PLACEHOLDERS.contains(&value.trim()) {
                value.clear();
            }
        }
        self
    }

    pub fn into_credential(self, source: CredentialSource) -> Result<Credential, IncompleteCredential> {
        Credential::new(&self.customer_id, &self.api_key, &self.secret_key, source)
    }
}

impl Debug for CredentialFields {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialFields")
            .field("customer_id", &redact(&self.customer_id))
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

fn redact(v: &str) -> &'static str {
    if v.trim().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

const TEMPLATE_PLACEHOLDERS: [&str; 3] = [
    "your_customer_id_here",
    "your_api_key_here",
    "your_secret_key_here",
];

/// One tier of the resolution chain.
pub trait CredentialTier: Send + Sync {
    /// The label attached to credentials this tier produces.
    fn source(&self) -> CredentialSource;

    /// Loads whatever fields this tier holds.
    ///
    /// - Nothing there: `Ok(None)`
    /// - Something there, complete or not: `Ok(Some(fields))`
    /// - Present but unreadable: `Err(CredentialError::StoreCorrupt)`
    fn load_fields(&self) -> Result<Option<CredentialFields>, CredentialError>;

    /// The complete credential this tier holds, if any.
    fn load_credential(&self) -> Result<Option<Credential>, CredentialError> {
        Ok(self
            .load_fields()?
            .and_then(|fields| fields.into_credential(self.source()).ok()))
    }
}

/// Values supplied by the running session, e.g. CLI flags.
#[derive(Clone, Default)]
pub struct OverrideSource {
    fields: Option<CredentialFields>,
}

impl OverrideSource {
    pub fn new(
        customer_id: Option<String>,
        api_key: Option<String>,
        secret_key: Option<String>,
    ) -> Self {
        Self {
            fields: CredentialFields::from_options(customer_id, api_key, secret_key),
        }
    }

    pub fn from_fields(fields: CredentialFields) -> Self {
        Self {
            fields: Some(fields),
        }
    }
}

impl CredentialTier for OverrideSource {
    fn source(&self) -> CredentialSource {
        CredentialSource::Override
    }

    fn load_fields(&self) -> Result<Option<CredentialFields>, CredentialError> {
        Ok(self.fields.clone())
    }
}

/// Platform-mounted TOML secrets file with a `[searchad]` table.
#[derive(Debug, Clone)]
pub struct SecretStoreSource {
    path: PathBuf,
}

#[derive(Deserialize)]
struct SecretsFile {
    searchad: Option<CredentialFields>,
}

impl SecretStoreSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Uses `KEYWORDTOOL_SECRETS_FILE` if set, otherwise the default mount.
    pub fn from_env() -> Self {
        let path = std::env::var(SECRETS_FILE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SECRETS_FILE.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl fmt::Display) -> CredentialError {
        CredentialError::StoreCorrupt {
            source_tier: CredentialSource::SecretStore,
            reason: format!("{}: {}", self.path.display(), reason),
        }
    }
}

impl CredentialTier for SecretStoreSource {
    fn source(&self) -> CredentialSource {
        CredentialSource::SecretStore
    }

    fn load_fields(&self) -> Result<Option<CredentialFields>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| self.corrupt(e))?;
        let parsed: SecretsFile = toml::from_str(&content).map_err(|e| self.corrupt(e))?;
        Ok(parsed
            .searchad
            .map(CredentialFields::without_placeholders)
            .filter(|f| !f.is_empty()))
    }
}

/// `NAVER_CUSTOMER_ID`, `NAVER_API_KEY` and `NAVER_SECRET_KEY`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl CredentialTier for EnvSource {
    fn source(&self) -> CredentialSource {
        CredentialSource::Environment
    }

    fn load_fields(&self) -> Result<Option<CredentialFields>, CredentialError> {
        let var = |name: &str| std::env::var(name).ok();
        Ok(CredentialFields::from_options(
            var(ENV_CUSTOMER_ID),
            var(ENV_API_KEY),
            var(ENV_SECRET_KEY),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn fields_report_missing() {
        let fields = CredentialFields::new("123", "  ", "");
        assert_eq!(
            fields.missing(),
            vec![CredentialField::ApiKey, CredentialField::SigningKey]
        );
        assert!(!fields.is_empty());
        assert!(CredentialFields::default().is_empty());
    }

    #[test]
    fn fields_debug_is_redacted() {
        let fields = CredentialFields::new("1234567", "hunter2", "");
        let out = format!("{:?}", fields);
        assert!(!out.contains("1234567"));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("<empty>"));
    }

    #[test]
    fn override_with_no_values_is_absent() {
        let tier = OverrideSource::new(None, None, None);
        assert!(tier.load_fields().unwrap().is_none());
    }

    #[test]
    fn override_partial_is_not_a_credential() {
        let tier = OverrideSource::new(Some("1".into()), Some("k".into()), None);
        assert!(tier.load_fields().unwrap().is_some());
        assert!(tier.load_credential().unwrap().is_none());
    }

    #[test]
    fn env_source_reads_all_three() {
        temp_env::with_vars(
            vec![
                (ENV_CUSTOMER_ID, Some("1234567")),
                (ENV_API_KEY, Some("env-key")),
                (ENV_SECRET_KEY, Some("env-secret")),
            ],
            || {
                let cred = EnvSource.load_credential().unwrap().unwrap();
                assert_eq!(cred.account_id(), "1234567");
                assert_eq!(cred.api_key(), "env-key");
                assert_eq!(cred.source(), CredentialSource::Environment);
            },
        );
    }

    #[test]
    fn env_source_absent_when_unset() {
        temp_env::with_vars_unset(vec![ENV_CUSTOMER_ID, ENV_API_KEY, ENV_SECRET_KEY], || {
            assert!(EnvSource.load_fields().unwrap().is_none());
        });
    }

    #[test]
    fn secret_store_reads_searchad_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywordtool.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            "[searchad]\ncustomer_id = \"42\"\napi_key = \"store-key\"\nsecret_key = \"store-secret\""
        )
        .unwrap();

        let cred = SecretStoreSource::new(&path).load_credential().unwrap().unwrap();
        assert_eq!(cred.account_id(), "42");
        assert_eq!(cred.source(), CredentialSource::SecretStore);
    }

    #[test]
    fn secret_store_template_values_are_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywordtool.toml");
        std::fs::write(
            &path,
            "[searchad]\ncustomer_id = \"your_customer_id_here\"\napi_key = \"your_api_key_here\"\nsecret_key = \"your_secret_key_here\"\n",
        )
        .unwrap();
        assert!(SecretStoreSource::new(&path).load_fields().unwrap().is_none());

        std::fs::write(
            &path,
            "[searchad]\ncustomer_id = \"42\"\napi_key = \"real-key\"\nsecret_key = \"your_secret_key_here\"\n",
        )
        .unwrap();
        let fields = SecretStoreSource::new(&path).load_fields().unwrap().unwrap();
        assert_eq!(fields.missing(), vec![CredentialField::SigningKey]);
    }

    #[test]
    fn secret_store_missing_file_is_absent() {
        let dir = tempdir().unwrap();
        let tier = SecretStoreSource::new(dir.path().join("nope.toml"));
        assert!(tier.load_fields().unwrap().is_none());
    }

    #[test]
    fn secret_store_without_table_is_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywordtool.toml");
        std::fs::write(&path, "[other]\nkey = 1\n").unwrap();
        assert!(SecretStoreSource::new(&path).load_fields().unwrap().is_none());
    }

    #[test]
    fn secret_store_garbage_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("keywordtool.toml");
        std::fs::write(&path, "[searchad\ncustomer_id = ").unwrap();
        let err = SecretStoreSource::new(&path).load_fields().unwrap_err();
        assert!(matches!(
            err,
            CredentialError::StoreCorrupt {
                source_tier: CredentialSource::SecretStore,
                ..
            }
        ));
    }

    #[test]
    fn secret_store_path_from_env() {
        temp_env::with_var(SECRETS_FILE_ENV, Some("/tmp/custom.toml"), || {
            assert_eq!(
                SecretStoreSource::from_env().path(),
                Path::new("/tmp/custom.toml")
            );
        });
        temp_env::with_var_unset(SECRETS_FILE_ENV, || {
            assert_eq!(
                SecretStoreSource::from_env().path(),
                Path::new(DEFAULT_SECRETS_FILE)
            );
        });
    }
}
