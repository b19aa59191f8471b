/*!
 * Integration tests for the danmu API client against a local server
 */

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use danmu2ass::app_config::Settings;
use danmu2ass::errors::FetchError;
use danmu2ass::providers::{CommentSource, GamerDanmuSource};

use crate::common;

/// Canned HTTP responses served in order, the last one repeating
struct MockServer {
    endpoint: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    async fn start(responses: Vec<(u16, &'static str, String)>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = format!("http://{}/anime/v1/danmu.php", listener.local_addr()?);
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let server_hits = hits.clone();
        let server_requests = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let index = server_hits.fetch_add(1, Ordering::SeqCst);
                let (status, content_type, body) = responses[index.min(responses.len() - 1)].clone();

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request_line = String::from_utf8_lossy(&request).lines().next().unwrap_or_default().to_string();
                server_requests.lock().await.push(request_line);

                let response = format!(
                    "HTTP/1.1 {} Status\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Ok(Self { endpoint, hits, requests })
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn fast_retry_settings() -> Settings {
    common::init_test_logging();
    Settings {
        retry_count: 2,
        retry_backoff_ms: 10,
        timeout_secs: 5,
        ..Settings::default()
    }
}

const JSON: &str = "application/json; charset=utf-8";

/// Test a successful fetch and the query it sends
#[tokio::test]
async fn test_fetch_withValidResponse_shouldReturnComments() -> Result<()> {
    let server = MockServer::start(vec![(200, JSON, common::sample_api_response().to_string())]).await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let comments = source.fetch("37890").await?;
    assert_eq!(comments.len(), 5);
    assert_eq!(server.hits(), 1);

    let requests = server.requests.lock().await;
    assert!(requests[0].starts_with("GET /anime/v1/danmu.php?videoSn=37890&geo=TW%2CHK "));
    Ok(())
}

/// Test retries on server errors
#[tokio::test]
async fn test_fetch_withTransientServerError_shouldRetryAndSucceed() -> Result<()> {
    let server = MockServer::start(vec![
        (503, "text/plain", "busy".to_string()),
        (502, "text/plain", "bad gateway".to_string()),
        (200, JSON, common::sample_api_response().to_string()),
    ])
    .await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let comments = source.fetch("1").await?;
    assert_eq!(comments.len(), 5);
    assert_eq!(server.hits(), 3);
    Ok(())
}

/// Test that retries stop after the configured count
#[tokio::test]
async fn test_fetch_withPersistentServerError_shouldGiveUp() -> Result<()> {
    let server = MockServer::start(vec![(500, "text/plain", "down".to_string())]).await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let err = source.fetch("1").await.unwrap_err();
    assert!(matches!(err, FetchError::ApiError { status_code: 500, .. }));
    assert_eq!(server.hits(), 3);
    Ok(())
}

/// Test that client errors are not retried
#[tokio::test]
async fn test_fetch_withNotFound_shouldFailImmediately() -> Result<()> {
    let server = MockServer::start(vec![(404, "text/plain", "no such video".to_string())]).await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let err = source.fetch("1").await.unwrap_err();
    assert!(matches!(err, FetchError::ApiError { status_code: 404, ref message } if message == "no such video"));
    assert_eq!(server.hits(), 1);
    Ok(())
}

/// Test a response without a danmu payload
#[tokio::test]
async fn test_fetch_withoutDanmuPayload_shouldReportMissingData() -> Result<()> {
    let server = MockServer::start(vec![(200, "text/html", r#"{"error":{"code":1}}"#.to_string())]).await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let err = source.fetch("99").await.unwrap_err();
    assert!(matches!(err, FetchError::MissingData(ref sn) if sn == "99"));
    assert_eq!(server.hits(), 1);
    Ok(())
}

/// Test that a long retry budget backs off without overflowing
#[tokio::test]
async fn test_fetch_withLargeRetryCount_shouldGiveUpWithoutOverflow() -> Result<()> {
    let server = MockServer::start(vec![(500, "text/plain", "down".to_string())]).await?;
    let settings = Settings {
        retry_count: 70,
        retry_backoff_ms: 0,
        ..fast_retry_settings()
    };
    let source = GamerDanmuSource::with_endpoint(&settings, server.endpoint.clone())?;

    let err = source.fetch("1").await.unwrap_err();
    assert!(matches!(err, FetchError::ApiError { status_code: 500, .. }));
    assert_eq!(server.hits(), 71);
    Ok(())
}

/// Test that one unreadable record does not discard the others
#[tokio::test]
async fn test_fetch_withBrokenRecord_shouldReturnRemainingComments() -> Result<()> {
    let body = r##"{"data":{"danmu":[
        {"text":"good","color":"#FFFFFF","size":1,"position":0,"time":10,"sn":1,"userid":"a"},
        {"text":"bad","color":"#FFFFFF","size":1,"position":null,"time":"abc","sn":2,"userid":"b"}
    ]}}"##;
    let server = MockServer::start(vec![(200, JSON, body.to_string())]).await?;
    let source = GamerDanmuSource::with_endpoint(&fast_retry_settings(), server.endpoint.clone())?;

    let comments = source.fetch("1").await?;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "good");
    Ok(())
}
