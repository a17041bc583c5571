use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::ScrapeError;

/// Downloads and parses the ranking page, retrying transport failures.
pub async fn fetch_page(settings: &Settings) -> Result<Html, ScrapeError> {
    let client = reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .build()?;

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(format!("Fetching {}", settings.url));
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = fetch_with_retry(&client, settings).await;
    pb.finish_and_clear();

    let body = result?;
    Ok(Html::parse_document(&body))
}

async fn fetch_with_retry(client: &reqwest::Client, settings: &Settings) -> Result<String, ScrapeError> {
    let mut attempt = 0;
    loop {
        match fetch_once(client, &settings.url).await {
            Err(e) if e.is_retryable() && attempt < settings.fetch_retries => {
                let backoff = backoff_for(settings.backoff_ms, attempt);
                warn!(
                    "Fetch failed (attempt {}/{}): {}, backing off {:.1}s",
                    attempt + 1,
                    settings.fetch_retries + 1,
                    e,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// The response is consumed within this call, so the connection is released on every path.
async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<String, ScrapeError> {
    let start = Instant::now();
    let body = client.get(url).send().await?.error_for_status()?.text().await?;
    info!(
        "Fetched {} ({} bytes in {}ms)",
        url,
        body.len(),
        start.elapsed().as_millis()
    );
    Ok(body)
}

fn backoff_for(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(attempt)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_for(2000, 0), Duration::from_millis(2000));
        assert_eq!(backoff_for(2000, 1), Duration::from_millis(4000));
        assert_eq!(backoff_for(2000, 3), Duration::from_millis(16000));
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(backoff_for(u64::MAX, 5), Duration::from_millis(u64::MAX));
    }

    /// Serves `status` to every connection and counts them.
    async fn serve_status(status: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut sock, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let reply = format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = sock.write_all(reply.as_bytes()).await;
                let _ = sock.shutdown().await;
            }
        });
        (format!("http://{addr}/topanime.php"), hits)
    }

    fn quick_retries(url: String) -> Settings {
        Settings {
            url,
            fetch_retries: 2,
            backoff_ms: 1,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let (url, hits) = serve_status("404 Not Found").await;
        let err = fetch_with_retry(&reqwest::Client::new(), &quick_retries(url)).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport(_)));
        assert!(!err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let (url, hits) = serve_status("503 Service Unavailable").await;
        let err = fetch_with_retry(&reqwest::Client::new(), &quick_retries(url)).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_failure() {
        let settings = Settings {
            url: "http://127.0.0.1:9/topanime.php".into(),
            fetch_retries: 0,
            ..Settings::default()
        };
        let client = reqwest::Client::new();
        let err = fetch_with_retry(&client, &settings).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Transport(_)));
        assert!(err.is_retryable());
    }
}
