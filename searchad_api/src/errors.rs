//! Error types for the API client and the classifier that maps every
//! transport outcome onto them.

use std::time::Duration;

use reqwest::StatusCode;

/// Classified failure of a signed call. Callers only ever see one of these.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// 401/403: the credential was rejected. Never retried.
    #[error("Authentication rejected (HTTP {status})")]
    Auth { status: u16, body: String },
    /// 429 or an explicit rate-limit body.
    #[error("Rate limited by provider")]
    RateLimited { retry_after: Option<Duration> },
    /// 5xx, connection failure, timeout, or an expired deadline.
    #[error("Transient failure: {reason}")]
    Transient { status: Option<u16>, reason: String },
    /// Any other 4xx or a body that could not be parsed. Never retried.
    #[error("Protocol error: {reason}")]
    FatalProtocol { status: Option<u16>, reason: String },
}

impl Error {
    /// Whether the retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::Transient { .. })
    }

    pub(crate) fn deadline_exceeded() -> Self {
        Error::Transient {
            status: None,
            reason: "deadline exceeded".to_string(),
        }
    }

    /// Stable short label for logs and CLI summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth { .. } => "auth",
            Error::RateLimited { .. } => "rate-limit",
            Error::Transient { .. } => "transient",
            Error::FatalProtocol { .. } => "protocol",
        }
    }
}

/// Maps an HTTP response onto the error taxonomy.
///
/// Returns `None` for a successful response that does not carry a rate-limit
/// message in its body.
pub fn classify_response(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> Option<Error> {
    let code = status.as_u16();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Some(Error::Auth {
            status: code,
            body: truncate_body(body),
        });
    }

    if status == StatusCode::TOO_MANY_REQUESTS || is_rate_limit_body(body) {
        return Some(Error::RateLimited { retry_after });
    }

    if status.is_server_error() {
        return Some(Error::Transient {
            status: Some(code),
            reason: format!("HTTP {}: {}", code, truncate_body(body)),
        });
    }

    if !status.is_success() {
        return Some(Error::FatalProtocol {
            status: Some(code),
            reason: format!("HTTP {}: {}", code, truncate_body(body)),
        });
    }

    None
}

/// Maps a `reqwest` failure onto the error taxonomy.
pub fn classify_transport(err: &reqwest::Error) -> Error {
    if err.is_decode() || err.is_builder() {
        return Error::FatalProtocol {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        };
    }
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        format!("network error: {}", err)
    };
    Error::Transient {
        status: err.status().map(|s| s.as_u16()),
        reason,
    }
}

/// Parses a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// The provider reports throttling as a JSON error object whose title or
/// message mentions the rate limit, sometimes under a non-429 status.
fn is_rate_limit_body(body: &str) -> bool {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
    else {
        return false;
    };
    ["title", "message", "detail"].iter().any(|key| {
        map.get(*key)
            .and_then(|v| v.as_str())
            .map(|s| {
                let lower = s.to_lowercase();
                lower.contains("rate limit") || lower.contains("too many requests")
            })
            .unwrap_or(false)
    })
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 500;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}
