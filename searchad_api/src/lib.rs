//! Client for the Naver Search Ad API: request signing, retry with
//! backoff, and typed keyword-tool responses.

mod client;
pub mod credential;
mod errors;
mod query;
pub mod retry;
pub mod signer;
pub mod types;
pub use self::client::{Client, DEFAULT_BASE_URL};
pub use self::credential::{Credential, CredentialField, CredentialSource, IncompleteCredential};
pub use self::errors::{classify_response, classify_transport, parse_retry_after, Error};
pub use self::query::{compact_hint, KeywordToolQuery, Query, MAX_HINTS_PER_CALL};
pub use self::retry::{BackoffPolicy, RequestTracker, TrackerSummary};
pub use self::signer::{sign, SignedRequest};
