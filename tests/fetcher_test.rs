// Tests for StationPageFetcher
// Uses mockito for HTTP mocking

use encoding_rs::SHIFT_JIS;
use marine_weather_service::fetch_error::FetchError;
use marine_weather_service::fetcher::StationPageFetcher;
use mockito::Server;
use std::time::Duration;

fn fetcher() -> StationPageFetcher {
    StationPageFetcher::new(Duration::from_secs(5)).expect("Failed to build HTTP client")
}

#[tokio::test]
async fn test_fetch_shift_jis_page() {
    let mut server = Server::new_async().await;
    let html = "<table><tr><th>時刻</th><th>風向</th></tr><tr><td>09:00</td><td>北東</td></tr></table>";
    let (body, _, _) = SHIFT_JIS.encode(html);

    let mock = server
        .mock("GET", "/daiosaki_lt.html")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(body.into_owned())
        .create_async()
        .await;

    let page = fetcher()
        .fetch_page(&format!("{}/daiosaki_lt.html", server.url()))
        .await
        .expect("fetch failed");

    assert_eq!(page, html);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_sends_browser_user_agent() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/page.html")
        .match_header("user-agent", mockito::Matcher::Regex("Mozilla".to_string()))
        .with_status(200)
        .with_body("<p>ok</p>")
        .create_async()
        .await;

    let page = fetcher()
        .fetch_page(&format!("{}/page.html", server.url()))
        .await
        .unwrap();

    assert_eq!(page, "<p>ok</p>");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_404_reports_status() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/missing.html")
        .with_status(404)
        .create_async()
        .await;

    let url = format!("{}/missing.html", server.url());
    let result = fetcher().fetch_page(&url).await;

    match result {
        Err(FetchError::Status { status, url: failed_url }) => {
            assert_eq!(status, 404);
            assert_eq!(failed_url, url);
        }
        other => panic!("Expected Status error, got {:?}", other),
    }

    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_unreachable_host_is_request_error() {
    // Port 9 (discard) is not listening in test environments
    let result = fetcher().fetch_page("http://127.0.0.1:9/page.html").await;
    assert!(matches!(result, Err(FetchError::Request(_))));
}
