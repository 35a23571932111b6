//! Signed HTTP client for the Naver Search Ad API.

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use url::Url;

use crate::{
    credential::Credential,
    errors::{classify_response, classify_transport, parse_retry_after, truncate_body},
    query::{KeywordToolQuery, Query},
    retry::{with_retry, BackoffPolicy, RequestTracker},
    signer::{now_millis, SignedRequest},
    types::KeywordToolResponse,
    Error,
};

/// Production base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.searchad.naver.com";

/// Timeout for a single HTTP attempt. The retry loop enforces the overall deadline.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client that signs every attempt and retries according to a
/// [`BackoffPolicy`].
///
/// Safe to share between concurrent analyses; each `send` call owns its own
/// retry state.
pub struct Client {
    http: reqwest::Client,
    /// Base URL for the API. Defaults to [`DEFAULT_BASE_URL`].
    base_api_url: String,
    policy: BackoffPolicy,
    tracker: RequestTracker,
}

impl Client {
    /// Creates a client pointing at the production API with the default policy.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                classify_transport(&e)
            })?;
        Ok(Self {
            http,
            base_api_url: base_url.trim_end_matches('/').to_string(),
            policy: BackoffPolicy::default(),
            tracker: RequestTracker::new(),
        })
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Deadline derived from the policy's overall budget, starting now.
    pub fn default_deadline(&self) -> Instant {
        Instant::now() + self.policy.overall_deadline
    }

    fn get_url(&self, path: &str) -> Result<Url, Error> {
        Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::FatalProtocol {
                status: None,
                reason: format!("invalid URL: {}", e),
            }
        })
    }

    /// Sends a signed GET to `path` with `params` and parses the JSON body.
    ///
    /// Each attempt is signed with a fresh timestamp. Retryable failures are
    /// retried under the client's policy until `deadline`.
    pub async fn send<T>(
        &self,
        credential: &Credential,
        path: &str,
        params: &[(String, String)],
        deadline: Instant,
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let url = self.get_url(path)?;
        let deadline = deadline.min(self.default_deadline());
        with_retry(&self.policy, deadline, &self.tracker, path, || {
            self.attempt(credential, &url, path, params)
        })
        .await
    }

    async fn attempt<T>(
        &self,
        credential: &Credential,
        url: &Url,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, Error>
    where
        T: DeserializeOwned,
    {
        let signed = SignedRequest::new(
            credential,
            Method::GET,
            path,
            params.to_vec(),
            now_millis(),
        )?;

        let resp = self
            .http
            .request(signed.method.clone(), url.clone())
            .headers(signed.headers)
            .query(&signed.query)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!("Request to {} failed: {}", path, e);
                classify_transport(&e)
            })?;

        let status = resp.status();
        let retry_after = parse_retry_after(
            resp.headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body = resp.text().await.map_err(|e| {
            tracing::debug!("Failed to read response body: {}", e);
            classify_transport(&e)
        })?;

        if let Some(err) = classify_response(status, retry_after, &body) {
            return Err(err);
        }

        serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse response: {} | body: {}", e, snippet);
            Error::FatalProtocol {
                status: Some(status.as_u16()),
                reason: format!("unparseable response body: {}", e),
            }
        })
    }

    /// Fetches related keywords and their monthly statistics.
    pub async fn keyword_tool(
        &self,
        credential: &Credential,
        query: &KeywordToolQuery,
        deadline: Instant,
    ) -> Result<KeywordToolResponse, Error> {
        if !query.is_valid() {
            return Err(Error::FatalProtocol {
                status: None,
                reason: format!(
                    "keyword tool query needs 1-{} hints and a month in 1-12",
                    crate::query::MAX_HINTS_PER_CALL
                ),
            });
        }
        self.send(credential, query.path(), &query.query_pairs(), deadline)
            .await
    }
}
