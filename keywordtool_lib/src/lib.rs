//! Library layer for the keyword tool: credential resolution, keyword
//! expansion, ranking, and summary helpers.
//!
//! Wraps the `searchad_api` crate with a tiered credential resolver, batched
//! expansion, input validation, and the processing that turns provider
//! records into a ranked result set.

pub mod analysis;
pub mod credentials;
pub mod error;
pub mod expansion;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod validation;

pub use searchad_api;
pub use searchad_api::types;
pub use searchad_api::{BackoffPolicy, Client, Credential, CredentialSource};

pub use analysis::{DeviceDistribution, KeywordDifficulty, KeywordStats};
pub use credentials::{
    CredentialError, CredentialFields, CredentialResolver, EncryptedFileStore, OverrideSource,
    SessionCredential,
};
pub use error::KeywordToolError;
pub use expansion::{KeywordExpansionService, MAX_CANDIDATES};
pub use pipeline::{analyze, resolve_credential, resolve_credential_with, KeywordAnalyzer};
pub use processor::{
    process, seeded_rows, KeywordResultSet, KeywordRow, NormalizedVolume, RankedKeywordRecord,
    SeededKeywordRow, SENTINEL_VOLUME,
};
pub use record::{RawKeywordRecord, SearchVolume};
