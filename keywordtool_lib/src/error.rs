//! Error types for the library layer.

use std::fmt;

use crate::credentials::CredentialError;

/// Errors produced by the library layer, wrapping classified API errors
/// and adding credential, serialization, and input validation failures.
#[derive(Debug)]
pub enum KeywordToolError {
    /// A classified error from the signed API client.
    Api(searchad_api::Error),
    /// Credential resolution or the local credential store failed.
    Credential(CredentialError),
    /// The seed keyword was empty after trimming.
    EmptySeed,
    /// JSON serialization or deserialization failed.
    Serialization(serde_json::Error),
    /// User-provided input failed validation.
    InvalidInput(String),
}

impl fmt::Display for KeywordToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {}", e),
            Self::Credential(e) => write!(f, "Credential error: {}", e),
            Self::EmptySeed => write!(f, "Seed keyword is empty"),
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for KeywordToolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Credential(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<searchad_api::Error> for KeywordToolError {
    fn from(e: searchad_api::Error) -> Self {
        Self::Api(e)
    }
}

impl From<CredentialError> for KeywordToolError {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

impl From<serde_json::Error> for KeywordToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}
