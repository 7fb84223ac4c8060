//! Shared HTTP client setup.

use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;

use crate::error::FetchError;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; diario_watch/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Build the client used for every portal and document request.
///
/// Timeouts are set per request, since searches and document downloads use
/// different limits.
pub fn client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Send a request and turn transport failures, timeouts and non-success
/// statuses into a [`FetchError`].
pub async fn send_checked(request: RequestBuilder, url: &str) -> Result<Response, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;
    debug!(%url, status = %response.status(), "HTTP response");
    response
        .error_for_status()
        .map_err(|e| FetchError::from_reqwest(url, e))
}

/// Read the whole body as text. A connection dropped or timed out while
/// the body streams in is a fetch failure like any other.
pub async fn read_text(response: Response, url: &str) -> Result<String, FetchError> {
    response.text().await.map_err(|e| FetchError::from_reqwest(url, e))
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single response that announces a longer body than it sends,
    /// then hang up. Returns the server's base URL.
    pub async fn truncated_body_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 1000\r\n\r\n<html>partial")
                    .await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }
}
