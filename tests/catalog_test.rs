//! Catalog client tests against a mock server

use mockito::{Matcher, Server};
use zapcast::api::{CatalogClient, CatalogError};
use zapcast::models::{CatalogParams, ContentType, ItemKind};
use zapcast::retry::ProbeOutcome;

// =============================================================================
// Listing Pages
// =============================================================================

#[tokio::test]
async fn test_fetch_sends_filters_and_parses_page() {
    let mut server = Server::new_async().await;

    let mock_response = r#"{
        "items": [
            {"id": "101", "title": "Alien", "kind": "movie", "year": 1979},
            {"id": "102", "title": "Aliens", "kind": "movie", "year": 1986},
            {"id": "c7", "title": "Sci-Fi", "kind": "category"}
        ],
        "total_count": 240
    }"#;

    let mock = server
        .mock("GET", "/api/catalog")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("type".into(), "movie".into()),
            Matcher::UrlEncoded("page".into(), "3".into()),
            Matcher::UrlEncoded("search".into(), "alien".into()),
            Matcher::UrlEncoded("category".into(), "scifi".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(mock_response)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let params = CatalogParams {
        content_type: ContentType::Movie,
        page: 3,
        search: Some("alien".into()),
        category: Some("scifi".into()),
        ..Default::default()
    };
    let page = client.fetch(&params).await.unwrap();

    mock.assert_async().await;

    assert_eq!(page.items.len(), 3);
    assert_eq!(page.total_count, Some(240));
    assert_eq!(page.items[0].title, "Alien");
    assert_eq!(page.items[0].year, Some(1979));
    assert_eq!(page.items[2].kind, ItemKind::Category);
}

#[tokio::test]
async fn test_fetch_omits_unset_filters() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/catalog")
        .match_query(Matcher::Regex("^type=series&page=1$".into()))
        .with_status(200)
        .with_body(r#"{"items": []}"#)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let params = CatalogParams {
        content_type: ContentType::Series,
        page: 1,
        search: Some(String::new()),
        ..Default::default()
    };
    let page = client.fetch(&params).await.unwrap();

    mock.assert_async().await;
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, None);
}

#[tokio::test]
async fn test_fetch_server_error_is_status() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/catalog")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let err = client.fetch(&CatalogParams::default()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Status(500)));

    let fetch_error = err.into_fetch_error(2);
    assert_eq!(fetch_error.page, 2);
    assert!(fetch_error.to_string().contains("500"));
}

#[tokio::test]
async fn test_fetch_malformed_body_is_parse_error() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/catalog")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let err = client.fetch(&CatalogParams::default()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
}

// =============================================================================
// Channels
// =============================================================================

#[tokio::test]
async fn test_channels_bare_array() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/channels")
        .with_status(200)
        .with_body(
            r#"[
                {"id": "1", "title": "News 24", "kind": "channel", "number": 1,
                 "cmd": "ffrt http://live/1", "now_playing": "Morning Briefing"},
                {"id": "2", "title": "Sports", "kind": "channel", "number": 2}
            ]"#,
        )
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let channels = client.channels().await.unwrap();

    mock.assert_async().await;
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].number, Some(1));
    assert_eq!(channels[0].now_playing.as_deref(), Some("Morning Briefing"));
    assert_eq!(channels[0].cmd.as_deref(), Some("ffrt http://live/1"));
    assert_eq!(channels[1].kind, ItemKind::Channel);
}

#[tokio::test]
async fn test_channels_wrapped_in_page() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/channels")
        .with_status(200)
        .with_body(r#"{"items": [{"id": "9", "title": "Music", "kind": "channel"}], "total_count": 1}"#)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(format!("{}/", server.url()));
    let channels = client.channels().await.unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].title, "Music");
}

// =============================================================================
// Stream Resolution
// =============================================================================

#[tokio::test]
async fn test_resolve_returns_command() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/api/stream")
        .match_query(Matcher::UrlEncoded(
            "cmd".into(),
            "ffrt http://local/ch/42".into(),
        ))
        .with_status(200)
        .with_body(r#"{"cmd": "ffrt http://cdn.example/42.ts?token=abc"}"#)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    let command = client.resolve("ffrt http://local/ch/42").await.unwrap();

    mock.assert_async().await;
    assert_eq!(command.as_deref(), Some("ffrt http://cdn.example/42.ts?token=abc"));
}

#[tokio::test]
async fn test_resolve_without_command_is_none() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"cmd": null}"#)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    assert_eq!(client.resolve("f1").await.unwrap(), None);
}

#[tokio::test]
async fn test_resolve_blank_command_is_none() {
    let mut server = Server::new_async().await;

    let _mock = server
        .mock("GET", "/api/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"cmd": "  "}"#)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    assert_eq!(client.resolve("f1").await.unwrap(), None);
}

// =============================================================================
// Probe
// =============================================================================

#[tokio::test]
async fn test_probe_reports_status() {
    let mut server = Server::new_async().await;

    let _gone = server
        .mock("HEAD", "/proxy/gone")
        .with_status(404)
        .create_async()
        .await;
    let _busy = server
        .mock("HEAD", "/proxy/busy")
        .with_status(503)
        .create_async()
        .await;

    let client = CatalogClient::with_base_url(server.url());
    assert_eq!(
        client.probe(&format!("{}/proxy/gone", server.url())).await,
        ProbeOutcome::Status(404)
    );
    assert_eq!(
        client.probe(&format!("{}/proxy/busy", server.url())).await,
        ProbeOutcome::Status(503)
    );
}

#[tokio::test]
async fn test_probe_unreachable() {
    let client = CatalogClient::with_base_url("http://127.0.0.1:1");
    let outcome = client.probe("http://127.0.0.1:1/proxy/x").await;
    assert!(matches!(outcome, ProbeOutcome::Unreachable(_)));
}
