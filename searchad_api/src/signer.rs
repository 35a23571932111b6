//! Request signing for the Search Ad API.
//!
//! Every request carries `X-Signature`, the base64 HMAC-SHA256 of
//! `"{timestamp}.{method}.{path}"` keyed with the account's secret key. The
//! field order and the `.` separator are part of the provider contract: any
//! change must bump [`SIGNATURE_VERSION`].

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use sha2::Sha256;

use crate::credential::Credential;
use crate::Error;

/// Version of the canonical-string format below.
pub const SIGNATURE_VERSION: u32 = 1;

// Header names are case-insensitive on the wire; `HeaderName` wants lowercase.
pub const HEADER_TIMESTAMP: &str = "x-timestamp";
pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_CUSTOMER: &str = "x-customer";
pub const HEADER_SIGNATURE: &str = "x-signature";

const SEPARATOR: char = '.';

/// Builds the string that gets signed.
pub fn canonical_string(timestamp: i64, method: &str, path: &str) -> String {
    format!("{timestamp}{SEPARATOR}{method}{SEPARATOR}{path}")
}

/// Signs `(timestamp, method, path)` with the credential's signing key.
///
/// Pure: identical inputs always produce identical signatures.
pub fn sign(credential: &Credential, method: &str, path: &str, timestamp: i64) -> String {
    // HMAC accepts keys of any length.
    let mut mac = Hmac::<Sha256>::new_from_slice(credential.signing_key().as_bytes())
        .expect("hmac accepts any key length");
    mac.update(canonical_string(timestamp, method, path).as_bytes());
    BASE64_STANDARD.encode(mac.finalize().into_bytes())
}

/// Milliseconds since the Unix epoch, read at call time.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One signed request. Built right before sending and dropped afterwards.
pub struct SignedRequest {
    pub method: Method,
    pub path: String,
    /// Query parameters in the order the provider expects them.
    pub query: Vec<(String, String)>,
    pub timestamp: i64,
    pub signature: String,
    pub headers: HeaderMap,
}

impl SignedRequest {
    /// Signs a request at `timestamp` and assembles its auth headers.
    pub fn new(
        credential: &Credential,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        timestamp: i64,
    ) -> Result<Self, Error> {
        let signature = sign(credential, method.as_str(), path, timestamp);

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=UTF-8"),
        );
        insert_header(&mut headers, HEADER_TIMESTAMP, &timestamp.to_string())?;
        insert_header(&mut headers, HEADER_API_KEY, credential.api_key())?;
        insert_header(&mut headers, HEADER_CUSTOMER, credential.account_id())?;
        insert_header(&mut headers, HEADER_SIGNATURE, &signature)?;

        Ok(Self {
            method,
            path: path.to_string(),
            query,
            timestamp,
            signature,
            headers,
        })
    }
}

impl std::fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Headers carry the API key; leave them out.
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<(), Error> {
    let value = HeaderValue::from_str(value).map_err(|_| {
        Error::FatalProtocol {
            status: None,
            reason: format!("{} contains characters not allowed in a header", name),
        }
    })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}
