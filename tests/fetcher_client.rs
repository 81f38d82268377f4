use policylens::fetcher::{Charset, FetchError, fetch};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn url(base: &str, suffix: &str) -> Url {
    Url::parse(&format!("{base}{suffix}")).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/policies/refund-policy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(
                    "<html><head><title>Refund policy</title></head><body>30 day returns</body></html>"
                        .as_bytes(),
                )
                .insert_header("Content-Type", "text/html; charset=utf-8"),
        )
        .mount(&mock_server)
        .await;

    let target = url(&mock_server.uri(), "/policies/refund-policy");
    let result = fetch(&target).await.unwrap();

    assert!(result.status.is_success());
    assert!(result.body.contains("30 day returns"));
    assert_eq!(result.url_final, target);
    assert_eq!(result.charset, Charset::Utf8);
}

#[tokio::test]
async fn test_fetch_404_is_not_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pages/returns"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/pages/returns")).await;

    match result {
        Err(FetchError::Http { status, retriable }) => {
            assert_eq!(status.as_u16(), 404);
            assert!(!retriable);
        }
        _ => panic!("Expected HTTP 404 error"),
    }
}

#[tokio::test]
async fn test_fetch_500_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pages/returns"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/pages/returns")).await;

    match result {
        Err(e @ FetchError::Http { status, .. }) => {
            assert_eq!(status.as_u16(), 500);
            assert!(e.is_transient());
        }
        _ => panic!("Expected HTTP 500 error"),
    }
}

#[tokio::test]
async fn test_fetch_follows_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pages/return-policy"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/policies/refund-policy"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/policies/refund-policy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes("<html><body>Final policy page</body></html>".as_bytes())
                .insert_header("Content-Type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/pages/return-policy"))
        .await
        .unwrap();

    assert!(result.status.is_success());
    assert!(result.body.contains("Final policy page"));
    assert!(result.url_final.path().ends_with("/policies/refund-policy"));
}

#[tokio::test]
async fn test_fetch_unsupported_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/logo.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]) // JPEG header
                .insert_header("Content-Type", "image/jpeg"),
        )
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/logo.jpg")).await;

    match result {
        Err(FetchError::UnsupportedContentType(content_type)) => {
            assert_eq!(content_type, "image/jpeg");
        }
        _ => panic!("Expected UnsupportedContentType error"),
    }
}

#[tokio::test]
async fn test_fetch_body_too_large() {
    let mock_server = MockServer::start().await;

    // 3MB body against the 2MB cap.
    let large_body = "x".repeat(3 * 1024 * 1024);

    Mock::given(method("GET"))
        .and(path("/pages/returns"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(large_body.as_bytes())
                .insert_header("Content-Type", "text/html")
                .insert_header("Content-Length", (3 * 1024 * 1024).to_string()),
        )
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/pages/returns")).await;

    match result {
        Err(FetchError::BodyTooLarge(size)) => {
            assert_eq!(size, 3 * 1024 * 1024);
        }
        _ => panic!("Expected BodyTooLarge error"),
    }
}

#[tokio::test]
async fn test_fetch_decodes_windows_1252() {
    let mock_server = MockServer::start().await;

    // "Garantie qualité" with an e-acute in windows-1252 (0xE9).
    let body: Vec<u8> = b"<html><body>Garantie qualit\xE9</body></html>".to_vec();

    Mock::given(method("GET"))
        .and(path("/pages/retours"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .insert_header("Content-Type", "text/html; charset=windows-1252"),
        )
        .mount(&mock_server)
        .await;

    let result = fetch(&url(&mock_server.uri(), "/pages/retours"))
        .await
        .unwrap();

    assert_eq!(result.charset, Charset::Windows1252);
    assert!(result.body.contains("Garantie qualité"));
}
