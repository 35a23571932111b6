use std::time::Duration;

use searchad_api::{
    sign, BackoffPolicy, Client, Credential, CredentialSource, Error, KeywordToolQuery,
};
use tokio::time::Instant;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const SECRET: &str = "test-secret-key";

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn credential() -> Credential {
    Credential::new("1234567", "test-api-key", SECRET, CredentialSource::Override).unwrap()
}

fn fast_policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy::default()
        .with_max_attempts(max_attempts)
        .with_base_delay(Duration::from_millis(5))
        .with_jitter(Duration::ZERO)
}

fn client(server: &MockServer, max_attempts: u32) -> Client {
    Client::with_base_url(&server.uri())
        .unwrap()
        .with_policy(fast_policy(max_attempts))
}

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(10)
}

fn coffee_query() -> KeywordToolQuery {
    KeywordToolQuery::default().with_hint("coffee")
}

/// Recomputes the signature from the request's own timestamp header.
struct ValidSignature;

impl Match for ValidSignature {
    fn matches(&self, request: &Request) -> bool {
        let header_str = |name: &str| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };
        let Some(timestamp) = header_str("x-timestamp").and_then(|v| v.parse::<i64>().ok())
        else {
            return false;
        };
        let expected = sign(
            &credential(),
            request.method.as_str(),
            request.url.path(),
            timestamp,
        );
        header_str("x-signature").as_deref() == Some(expected.as_str())
    }
}

#[tokio::test]
async fn keyword_tool_success_with_signed_headers() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("keywordstool.json");

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(query_param("hintKeywords", "coffee"))
        .and(query_param("showDetail", "1"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("x-customer", "1234567"))
        .and(header_exists("x-timestamp"))
        .and(ValidSignature)
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 3);
    let resp = client
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await
        .unwrap();

    assert_eq!(resp.keyword_list.len(), 4);
    assert_eq!(resp.keyword_list[0].rel_keyword, "커피");

    let summary = client.tracker().summary();
    assert_eq!(summary.attempts, 1);
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"title\":\"Invalid signature\"}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(result, Err(Error::Auth { status: 401, .. })));
}

#[tokio::test]
async fn forbidden_is_auth_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(result, Err(Error::Auth { status: 403, .. })));
}

#[tokio::test]
async fn always_unavailable_makes_exactly_max_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 3);
    let result = client
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;

    assert!(matches!(
        result,
        Err(Error::Transient {
            status: Some(503),
            ..
        })
    ));
    let summary = client.tracker().summary();
    assert_eq!(summary.attempts, 3);
    assert_eq!(summary.retries, 2);
}

#[tokio::test]
async fn retry_recovers_and_resigns_each_attempt() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("keywordstool.json");

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .and(ValidSignature)
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resp = client(&mock_server, 3)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await
        .unwrap();
    assert_eq!(resp.keyword_list.len(), 4);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let ts = |r: &Request| {
        r.headers
            .get("x-timestamp")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    };
    assert_ne!(ts(&requests[0]), ts(&requests[1]));
}

#[tokio::test]
async fn rate_limit_honors_retry_after_then_succeeds() {
    let mock_server = MockServer::start().await;
    let body = load_fixture("keywordstool_empty.json");

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(200).set_body_string(&body))
        .mount(&mock_server)
        .await;

    let client = client(&mock_server, 3);
    let resp = client
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await
        .unwrap();
    assert!(resp.keyword_list.is_empty());
    assert_eq!(client.tracker().summary().rate_limited, 1);
}

#[tokio::test]
async fn rate_limit_exhaustion_surfaces_rate_limit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(429))
        .expect(2)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 2)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(result, Err(Error::RateLimited { .. })));
}

#[tokio::test]
async fn malformed_json_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not valid json}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(result, Err(Error::FatalProtocol { .. })));
}

#[tokio::test]
async fn bad_request_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(ResponseTemplate::new(400).set_body_string("{\"title\":\"Invalid parameter\"}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3)
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(
        result,
        Err(Error::FatalProtocol {
            status: Some(400),
            ..
        })
    ));
}

#[tokio::test]
async fn slow_response_is_abandoned_at_deadline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/keywordstool"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"keywordList\":[]}")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let started = std::time::Instant::now();
    let result = client(&mock_server, 3)
        .keyword_tool(
            &credential(),
            &coffee_query(),
            Instant::now() + Duration::from_millis(200),
        )
        .await;

    match result {
        Err(Error::Transient { reason, .. }) => assert_eq!(reason, "deadline exceeded"),
        other => panic!("unexpected {:?}", other.map(|r| r.keyword_list.len())),
    }
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn connection_refused_is_transient() {
    // Nothing listens on port 1.
    let client = Client::with_base_url("http://127.0.0.1:1")
        .unwrap()
        .with_policy(fast_policy(2));
    let result = client
        .keyword_tool(&credential(), &coffee_query(), deadline())
        .await;
    assert!(matches!(result, Err(Error::Transient { .. })));
    assert_eq!(client.tracker().summary().attempts, 2);
}

#[tokio::test]
async fn invalid_query_fails_before_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = client(&mock_server, 3)
        .keyword_tool(&credential(), &KeywordToolQuery::default(), deadline())
        .await;
    assert!(matches!(result, Err(Error::FatalProtocol { status: None, .. })));
}
