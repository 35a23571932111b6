use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use searchad_api::{Credential, CredentialField, CredentialSource};

use super::encrypted_file::EncryptedFileStore;
use super::sources::{CredentialTier, EnvSource, OverrideSource, SecretStoreSource};
use super::CredentialError;

/// Tries each tier in insertion order.
///
/// - A tier with all three fields wins and resolution stops.
/// - A tier with nothing, or only some fields, is skipped. Fields are never
///   mixed between tiers.
/// - A corrupt tier fails resolution immediately.
#[derive(Default)]
pub struct CredentialResolver {
    tiers: Vec<Box<dyn CredentialTier>>,
}

impl CredentialResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override, managed secret store, environment, encrypted file.
    pub fn standard(overrides: OverrideSource) -> Self {
        Self::new()
            .with_tier(overrides)
            .with_tier(SecretStoreSource::from_env())
            .with_tier(EnvSource)
            .with_tier(EncryptedFileStore::from_env())
    }

    pub fn with_tier(mut self, tier: impl CredentialTier + 'static) -> Self {
        self.push(tier);
        self
    }

    pub fn push(&mut self, tier: impl CredentialTier + 'static) -> &mut Self {
        self.tiers.push(Box::new(tier));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn resolve(&self) -> Result<Credential, CredentialError> {
        let mut checked = Vec::with_capacity(self.tiers.len());
        let mut closest: Option<Vec<CredentialField>> = None;

        for tier in &self.tiers {
            let source = tier.source();
            checked.push(source);
            let Some(fields) = tier.load_fields()? else {
                tracing::debug!("Credential tier {} is empty", source);
                continue;
            };
            match fields.into_credential(source) {
                Ok(cred) => {
                    tracing::debug!("Resolved credential from {}", source);
                    return Ok(cred);
                }
                Err(incomplete) => {
                    tracing::debug!("Credential tier {} is partial: {}", source, incomplete);
                    if closest
                        .as_ref()
                        .map_or(true, |m| incomplete.missing.len() < m.len())
                    {
                        closest = Some(incomplete.missing);
                    }
                }
            }
        }

        Err(CredentialError::Missing {
            missing: closest.unwrap_or_else(|| CredentialField::ALL.to_vec()),
            checked,
        })
    }

    /// Reports the state of every tier without exposing any values.
    pub fn describe(&self) -> Vec<TierReport> {
        self.tiers
            .iter()
            .map(|tier| {
                let status = match tier.load_fields() {
                    Ok(None) => TierStatus::Absent,
                    Ok(Some(fields)) => {
                        let missing = fields.missing();
                        if missing.is_empty() {
                            TierStatus::Complete
                        } else if missing.len() == CredentialField::ALL.len() {
                            TierStatus::Absent
                        } else {
                            TierStatus::Partial(missing)
                        }
                    }
                    Err(e) => TierStatus::Corrupt(e.to_string()),
                };
                TierReport {
                    source: tier.source(),
                    status,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierStatus {
    Complete,
    Partial(Vec<CredentialField>),
    Absent,
    Corrupt(String),
}

impl fmt::Display for TierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierStatus::Complete => f.write_str("complete"),
            TierStatus::Partial(missing) => {
                let names: Vec<&str> = missing.iter().map(|m| m.name()).collect();
                write!(f, "partial (missing {})", names.join(", "))
            }
            TierStatus::Absent => f.write_str("absent"),
            TierStatus::Corrupt(reason) => write!(f, "corrupt ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierReport {
    pub source: CredentialSource,
    pub status: TierStatus,
}

/// The credential shared by every analysis in a session.
///
/// Readers get an `Arc` snapshot. Re-resolution swaps in a new `Arc`, so a
/// call already in flight keeps signing with the credential it started with.
#[derive(Default)]
pub struct SessionCredential {
    current: RwLock<Option<Arc<Credential>>>,
}

impl SessionCredential {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, credential: Credential) -> Arc<Credential> {
        let fresh = Arc::new(credential);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(fresh.clone());
        fresh
    }

    /// Returns the current credential, resolving it on first use.
    pub fn get_or_resolve(
        &self,
        resolver: &CredentialResolver,
    ) -> Result<Arc<Credential>, CredentialError> {
        if let Some(cred) = self.current() {
            return Ok(cred);
        }
        self.refresh(resolver)
    }

    /// Resolves again and swaps the result in.
    pub fn refresh(&self, resolver: &CredentialResolver) -> Result<Arc<Credential>, CredentialError> {
        let cred = resolver.resolve()?;
        Ok(self.replace(cred))
    }

    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
