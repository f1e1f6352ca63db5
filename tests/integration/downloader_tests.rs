//! Integration tests for the reqwest downloader
//!
//! These tests use wiremock to create mock HTTP servers. The mock servers
//! listen on an IP and port, which the crawl loop refuses, so the downloader
//! is exercised directly.

use std::time::Duration;
use sumi_crawl::config::UserAgentConfig;
use sumi_crawl::crawler::{build_http_client, fetch_url, DownloadLimits, ReqwestDownloader};
use sumi_crawl::{DownloadResult, Downloader, Request};
use tokio::sync::oneshot;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn limits(max_content_length: usize) -> DownloadLimits {
    DownloadLimits {
        max_content_length,
        accepted_media_types: vec!["text/html".to_string(), "text/plain".to_string()],
    }
}

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

async fn fetch(server: &MockServer, route: &str, max_content_length: usize) -> DownloadResult {
    let client = build_http_client(&user_agent()).expect("Failed to build client");
    let url = format!("{}{}", server.uri(), route);
    fetch_url(&client, &limits(max_content_length), &url, 9).await
}

#[tokio::test]
async fn test_fetch_html_page() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Hello</body></html>", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/page", 1024).await;

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.id, 9);
    assert_eq!(result.text(), "<html><body>Hello</body></html>");
    assert!(result.media_type.matches("text/html"));
    assert_eq!(result.media_type.charset, "utf-8");
    assert!(result.download_speed > 0.0);
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/robots.txt", 1024).await;
    assert!(result.success, "{}", result.error_message);
    assert!(result.media_type.matches("text/plain"));
}

#[tokio::test]
async fn test_not_found_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/missing", 1024).await;

    assert!(!result.success);
    assert_eq!(result.error_message, "http response not successful: 404");
    assert!(result.content.is_empty());
}

#[tokio::test]
async fn test_rejected_media_type_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 8], "image/png"))
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/image.png", 1024).await;

    assert!(!result.success);
    assert!(result.error_message.contains("image/png"));
}

#[tokio::test]
async fn test_oversized_content_fails() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("x".repeat(100), "text/html"))
        .mount(&mock_server)
        .await;

    let result = fetch(&mock_server, "/big", 16).await;

    assert!(!result.success);
    assert!(result.error_message.contains("16"));
}

#[tokio::test]
async fn test_unreachable_host_fails() {
    let client = build_http_client(&user_agent()).unwrap();
    // Port 9 on localhost is not expected to accept connections
    let result = fetch_url(&client, &limits(1024), "http://127.0.0.1:9/", 1).await;

    assert!(!result.success);
    assert!(!result.error_message.is_empty());
}

#[tokio::test]
async fn test_downloader_invokes_callback() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .mount(&mock_server)
        .await;

    let downloader = ReqwestDownloader::new(&user_agent(), limits(1024)).unwrap();
    let (tx, rx) = oneshot::channel();
    downloader.download(Request::new(
        format!("{}/", mock_server.uri()),
        42,
        move |result: DownloadResult| {
            let _ = tx.send(result);
        },
    ));

    let result = tokio::time::timeout(Duration::from_secs(10), rx)
        .await
        .expect("callback never ran")
        .expect("callback dropped");

    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.id, 42);
    assert_eq!(result.content, b"<html></html>");
}

#[tokio::test]
async fn test_dropping_downloader_aborts_pending_callbacks() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html></html>", "text/html")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let downloader = ReqwestDownloader::new(&user_agent(), limits(1024)).unwrap();
    let (tx, rx) = oneshot::channel::<DownloadResult>();
    downloader.download(Request::new(
        format!("{}/slow", mock_server.uri()),
        1,
        move |result: DownloadResult| {
            let _ = tx.send(result);
        },
    ));
    assert_eq!(downloader.in_flight(), 1);

    drop(downloader);

    // The aborted task drops the callback without calling it
    let outcome = tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("abort did not release the callback");
    assert!(outcome.is_err());
}
