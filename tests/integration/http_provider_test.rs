// HttpLookupProvider against a minimal in-process HTTP server

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use streamscout::config::ProviderConfig;
use streamscout::provider::{HttpLookupProvider, LookupProvider};
use streamscout::{AccessType, AvailabilityService, Provenance, ProviderError};

use super::harness::test_config;

/// Serve `status`/`body` to every connection; returns the endpoint URL and
/// the raw requests received
async fn serve(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let log = seen.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let log = log.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                log.lock().push(request);
                let response = format!(
                    "HTTP/1.1 {} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{}/availability", addr), seen)
}

/// Read headers plus a content-length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn provider(endpoint: String, api_key: Option<&str>) -> HttpLookupProvider {
    HttpLookupProvider::new(&ProviderConfig {
        endpoint,
        api_key: api_key.map(str::to_string),
    })
    .unwrap()
}

const MATRIX: &str = r#"{"results": {"603": [
    {"service": {"name": "Netflix"}, "type": "subscription", "link": "https://netflix.com/title/603"},
    {"service": {"name": "Apple TV"}, "streamingType": "rent", "price": {"amount": "3.99", "currency": "USD"}}
]}}"#;

#[tokio::test]
async fn test_posts_ids_and_region_with_bearer_key() {
    let (endpoint, seen) = serve(200, MATRIX).await;
    let provider = provider(endpoint, Some("secret-key"));

    let results = provider.lookup_batch(&[603, 155], "pl").await.unwrap();

    let request = seen.lock()[0].clone();
    assert!(request.starts_with("POST /availability"));
    assert!(request
        .to_ascii_lowercase()
        .contains("authorization: bearer secret-key"));
    assert!(request.contains(r#""ids":[603,155]"#));
    assert!(request.contains(r#""country":"pl""#));

    let matrix = &results[&603];
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix.options[1].access_type, AccessType::Rental);
    assert!(!results.contains_key(&155), "absent id is missing");
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (endpoint, _) = serve(429, r#"{"error": "rate limited"}"#).await;
    let provider = provider(endpoint, None);

    let err = provider.lookup_batch(&[603], "us").await.unwrap_err();
    match err {
        ProviderError::Status { status, message } => {
            assert_eq!(status, 429);
            assert!(message.contains("rate limited"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_reported() {
    let (endpoint, _) = serve(200, r#"{"movies": []}"#).await;
    let provider = provider(endpoint, None);

    let err = provider.lookup_batch(&[603], "us").await.unwrap_err();
    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn test_service_over_http_end_to_end() {
    let (endpoint, seen) = serve(200, MATRIX).await;
    let service = AvailabilityService::with_store(
        &test_config(),
        Arc::new(provider(endpoint, None)),
        Arc::new(streamscout::cache::MemoryStore::default()),
    )
    .unwrap();

    let first = service.lookup(603, "us").await;
    let second = service.lookup(603, "us").await;

    assert_eq!(first.provenance, Provenance::Api);
    assert_eq!(first.options.options[0].provider, "Netflix");
    assert_eq!(second.provenance, Provenance::Cache);
    assert_eq!(seen.lock().len(), 1);
}
