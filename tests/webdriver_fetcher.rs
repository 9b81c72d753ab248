use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use contentfetch::config::{WebDriverConfig, WebDriverProxyConfig};
use contentfetch::fetchers::{FetchError, FetchRequest, Fetcher, WebDriverFetcher};

const SESSION: &str = "abc123";

fn config_for(server: &MockServer) -> WebDriverConfig {
    WebDriverConfig {
        url: Some(format!("{}/wd/hub", server.uri())),
        delay_before_content_ready_secs: 0,
        ..Default::default()
    }
}

fn request() -> FetchRequest {
    FetchRequest::builder()
        .url("https://example.com/page")
        .timeout(Duration::from_secs(5))
        .build()
}

fn session_path(suffix: &str) -> String {
    format!("/wd/hub/session/{SESSION}{suffix}")
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/wd/hub/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": SESSION, "capabilities": { "browserName": "chrome" } }
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(session_path("/timeouts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(server)
        .await;
}

async fn mount_quit(server: &MockServer) {
    Mock::given(method("DELETE"))
        .and(path(session_path("")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_returns_page_source_and_closes_session() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_quit(&server).await;

    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .and(body_partial_json(json!({ "url": "https://example.com/page" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "value": "<html><body>rendered</body></html>" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let response = fetcher.run(&request()).await.unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(response.content, "<html><body>rendered</body></html>");
    assert!(response.headers.is_empty());
    assert_eq!(fetcher.last_status_code(), Some(200));
}

#[tokio::test]
async fn test_navigation_failure_still_closes_session() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_quit(&server).await;

    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "unknown error", "message": "net::ERR_NAME_NOT_RESOLVED" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "" })))
        .expect(0)
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let err = fetcher.run(&request()).await.unwrap_err();

    match err {
        FetchError::WebDriver { status, error, message } => {
            assert_eq!(status, 500);
            assert_eq!(error, "unknown error");
            assert!(message.contains("ERR_NAME_NOT_RESOLVED"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(fetcher.content().is_none());
    assert!(fetcher.last_error().is_some());
}

#[tokio::test]
async fn test_remote_page_load_timeout_is_timeout() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_quit(&server).await;

    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "timeout", "message": "page load timed out" }
        })))
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let err = fetcher.run(&request()).await.unwrap_err();

    assert!(err.is_timeout(), "unexpected error: {err:?}");
    assert!(matches!(
        err,
        FetchError::Timeout { ref url, .. } if url == "https://example.com/page"
    ));
}

#[tokio::test]
async fn test_empty_page_source_is_not_an_empty_reply() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_quit(&server).await;

    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "" })))
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let response = fetcher.run(&request()).await.unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.content, "");
}

async fn mount_navigation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(server)
        .await;
}

fn assert_invalid_response(err: FetchError) {
    match err {
        FetchError::WebDriver { status, error, .. } => {
            assert_eq!(status, 200);
            assert_eq!(error, "invalid response");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_page_source_is_an_error() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_navigation(&server).await;
    mount_quit(&server).await;

    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json at all"))
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let err = fetcher.run(&request()).await.unwrap_err();

    assert_invalid_response(err);
    assert!(fetcher.content().is_none());
    assert!(fetcher.last_status_code().is_none());
}

#[tokio::test]
async fn test_non_string_page_source_is_an_error() {
    let server = MockServer::start().await;
    mount_session(&server).await;
    mount_navigation(&server).await;
    mount_quit(&server).await;

    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let err = fetcher.run(&request()).await.unwrap_err();

    assert_invalid_response(err);
    assert!(fetcher.content().is_none());
}

#[tokio::test]
async fn test_non_json_session_reply_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wd/hub/session"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Sign in</body></html>"),
        )
        .mount(&server)
        .await;

    let fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    assert_invalid_response(fetcher.is_ready().await.unwrap_err());
}

#[tokio::test]
async fn test_proxy_capability_sent_with_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wd/hub/session"))
        .and(body_partial_json(json!({
            "capabilities": { "alwaysMatch": {
                "browserName": "chrome",
                "proxy": { "proxyType": "manual", "httpProxy": "proxy:3128" }
            }}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": SESSION, "capabilities": {} }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(session_path("/timeouts")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(session_path("/url")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(session_path("/source")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "<p>ok</p>" })))
        .mount(&server)
        .await;
    mount_quit(&server).await;

    let config = WebDriverConfig {
        proxy: WebDriverProxyConfig {
            http_proxy: Some("proxy:3128".to_string()),
            ..Default::default()
        },
        ..config_for(&server)
    };
    let mut fetcher = WebDriverFetcher::new(config).unwrap();
    let response = fetcher.run(&request()).await.unwrap();
    assert_eq!(response.content, "<p>ok</p>");
}

#[tokio::test]
async fn test_legacy_session_response_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wd/hub/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessionId": SESSION, "status": 0, "value": { "browserName": "chrome" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_quit(&server).await;

    let fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    assert!(fetcher.is_ready().await.unwrap());
}

#[tokio::test]
async fn test_session_not_created_skips_quit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wd/hub/session"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": { "error": "session not created", "message": "no free slots" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut fetcher = WebDriverFetcher::new(config_for(&server)).unwrap();
    let err = fetcher.run(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::WebDriver { ref error, .. } if error == "session not created"
    ));
}

#[tokio::test]
async fn test_unreachable_endpoint() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = WebDriverConfig {
        url: Some(format!("http://127.0.0.1:{port}/wd/hub")),
        ..Default::default()
    };
    let fetcher = WebDriverFetcher::new(config).unwrap();

    let err = fetcher.is_ready().await.unwrap_err();
    assert!(
        matches!(err, FetchError::Unreachable { .. }),
        "unexpected error: {err:?}"
    );
}
