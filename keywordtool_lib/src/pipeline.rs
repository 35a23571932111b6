//! Seed in, ranked result set out.

use std::sync::Arc;

use searchad_api::{BackoffPolicy, Client, Credential, DEFAULT_BASE_URL};
use tokio::time::Instant;

use crate::credentials::{CredentialResolver, OverrideSource};
use crate::error::KeywordToolError;
use crate::expansion::KeywordExpansionService;
use crate::processor::{process, KeywordResultSet};

/// Points the client at another host, e.g. a local mock.
pub const BASE_URL_ENV: &str = "SEARCHAD_BASE_URL";

/// Builds a client from `SEARCHAD_BASE_URL` and the `SEARCHAD_RETRY_*`
/// variables.
pub fn client_from_env() -> Result<Client, KeywordToolError> {
    let base_url = std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let client = Client::with_base_url(&base_url)?.with_policy(BackoffPolicy::from_env());
    Ok(client)
}

/// Resolves the credential from the secret store, environment, or encrypted
/// file.
pub fn resolve_credential() -> Result<Credential, KeywordToolError> {
    resolve_credential_with(OverrideSource::default())
}

/// Like [`resolve_credential`] with session-supplied values tried first.
pub fn resolve_credential_with(overrides: OverrideSource) -> Result<Credential, KeywordToolError> {
    Ok(CredentialResolver::standard(overrides).resolve()?)
}

/// Expansion followed by processing. Cheap to clone and share between tasks.
#[derive(Clone)]
pub struct KeywordAnalyzer {
    expansion: KeywordExpansionService,
}

impl KeywordAnalyzer {
    pub fn new(expansion: KeywordExpansionService) -> Self {
        Self { expansion }
    }

    pub fn from_client(client: Client) -> Self {
        Self::new(KeywordExpansionService::new(Arc::new(client)))
    }

    pub fn from_env() -> Result<Self, KeywordToolError> {
        Ok(Self::from_client(client_from_env()?))
    }

    pub fn expansion(&self) -> &KeywordExpansionService {
        &self.expansion
    }

    pub async fn analyze(
        &self,
        seed: &str,
        credential: &Credential,
        deadline: Instant,
    ) -> Result<KeywordResultSet, KeywordToolError> {
        self.analyze_with_hints(seed, &[], credential, deadline).await
    }

    pub async fn analyze_with_hints(
        &self,
        seed: &str,
        hints: &[String],
        credential: &Credential,
        deadline: Instant,
    ) -> Result<KeywordResultSet, KeywordToolError> {
        let raw = self
            .expansion
            .expand_with_hints(credential, seed, hints, deadline)
            .await?;
        let set = process(seed, raw);
        tracing::info!("Ranked {} keywords for {:?}", set.len(), set.seed_keyword());
        Ok(set)
    }
}

/// Analyzes one seed with a client configured from the environment.
pub async fn analyze(
    seed: &str,
    credential: &Credential,
    deadline: Instant,
) -> Result<KeywordResultSet, KeywordToolError> {
    KeywordAnalyzer::from_env()?
        .analyze(seed, credential, deadline)
        .await
}
