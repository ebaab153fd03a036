use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::api::{GenerateRequest, GenerateResponse};
use crate::utils::url::{generate_url, health_url, service_root};

/// Bound on the health probe; the probe reports `false` once it elapses.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a single `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The service could not be reached.
    Transport(String),
    /// No answer arrived within the configured request timeout.
    Timeout,
    /// The service answered with a non-2xx status.
    Http { status: u16, body: String },
    /// A 2xx answer whose body was not the expected JSON.
    Decode(String),
}

impl InferenceError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else if err.is_decode() || err.is_body() {
            InferenceError::Decode(err.to_string())
        } else {
            InferenceError::Transport(err.to_string())
        }
    }

    /// True for failures where the request never got an answer.
    pub fn is_network(&self) -> bool {
        matches!(self, InferenceError::Transport(_) | InferenceError::Timeout)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            InferenceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferenceError::Transport(reason) => write!(f, "Network error: {reason}"),
            InferenceError::Timeout => write!(f, "Request timed out"),
            InferenceError::Http { status, body } if body.trim().is_empty() => {
                write!(f, "API Error: {status}")
            }
            InferenceError::Http { status, body } => {
                write!(f, "API Error: {status}: {}", body.trim())
            }
            InferenceError::Decode(reason) => write!(f, "Malformed API response: {reason}"),
        }
    }
}

impl StdError for InferenceError {}

/// The remote text-generation service.
///
/// Implementations never retry on their own; retry policy belongs to the
/// session controller.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Reduces every outcome to reachable or not. Never fails.
    async fn health_check(&self) -> bool;
}

#[derive(Clone, Debug)]
pub struct HttpInferenceClient {
    client: reqwest::Client,
    root: String,
    request_timeout: Option<Duration>,
}

impl HttpInferenceClient {
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, request_timeout)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            root: service_root(base_url),
            request_timeout,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        let mut request = self
            .client
            .post(generate_url(&self.root))
            .header("Content-Type", "application/json")
            .json(&GenerateRequest { prompt });
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(InferenceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(InferenceError::from_reqwest)?;
        Ok(parsed.response)
    }

    async fn health_check(&self) -> bool {
        let url = health_url(&self.root);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => {
                let healthy = response.status().is_success();
                debug!(%url, status = response.status().as_u16(), healthy, "Health check answered");
                healthy
            }
            Err(err) => {
                debug!(%url, error = %err, "Health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    struct CapturedRequest {
        request_line: String,
        body: String,
    }

    async fn read_http_request(stream: &mut TcpStream) -> Result<CapturedRequest, String> {
        let mut buffer = Vec::new();
        let mut header_end = None;
        while header_end.is_none() {
            let mut chunk = [0_u8; 1024];
            let read = stream.read(&mut chunk).await.map_err(|e| e.to_string())?;
            if read == 0 {
                return Err("Unexpected EOF while reading HTTP headers".to_string());
            }
            buffer.extend_from_slice(&chunk[..read]);
            header_end = buffer
                .windows(4)
                .position(|window| window == b"\r\n\r\n")
                .map(|index| index + 4);
        }

        let header_end = header_end.unwrap_or(buffer.len());
        let header_text =
            String::from_utf8(buffer[..header_end].to_vec()).map_err(|e| e.to_string())?;
        let request_line = header_text.lines().next().unwrap_or_default().to_string();
        let content_length = header_text
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buffer[header_end..].to_vec();
        while body.len() < content_length {
            let mut chunk = [0_u8; 1024];
            let read = stream.read(&mut chunk).await.map_err(|e| e.to_string())?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Ok(CapturedRequest {
            request_line,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Serves exactly one request with the given status and body.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<Result<CapturedRequest, String>>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let addr = listener.local_addr().expect("local addr should resolve");
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.map_err(|e| e.to_string())?;
            let captured = read_http_request(&mut stream).await?;
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .await
                .map_err(|e| e.to_string())?;
            Ok(captured)
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn generate_posts_prompt_and_returns_response() {
        let (base, server) = serve_once("200 OK", r#"{"response":"Stay hydrated."}"#).await;
        let client = HttpInferenceClient::new(&base, Some(Duration::from_secs(5)));

        let reply = client.generate("Question: thirsty?").await;
        assert_eq!(reply, Ok("Stay hydrated.".to_string()));

        let captured = server.await.unwrap().unwrap();
        assert!(captured.request_line.starts_with("POST /generate "));
        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(body, serde_json::json!({ "prompt": "Question: thirsty?" }));
    }

    #[tokio::test]
    async fn configured_generate_url_is_accepted() {
        let (base, server) = serve_once("200 OK", r#"{"response":"ok"}"#).await;
        let client = HttpInferenceClient::new(&format!("{base}/generate"), None);
        assert_eq!(client.root(), base);
        assert_eq!(client.generate("p").await, Ok("ok".to_string()));
        let captured = server.await.unwrap().unwrap();
        assert!(captured.request_line.starts_with("POST /generate "));
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error() {
        let (base, _server) =
            serve_once("503 Service Unavailable", r#"{"detail":"loading"}"#).await;
        let client = HttpInferenceClient::new(&base, None);

        let err = client.generate("p").await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_network());
        assert!(err.to_string().starts_with("API Error: 503"));
    }

    #[tokio::test]
    async fn unexpected_body_is_a_decode_error() {
        let (base, _server) = serve_once("200 OK", r#"{"text":"wrong field"}"#).await;
        let client = HttpInferenceClient::new(&base, None);
        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, InferenceError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpInferenceClient::new(&format!("http://{addr}"), None);
        let err = client.generate("p").await.unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)), "got {err:?}");
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let client =
            HttpInferenceClient::new(&format!("http://{addr}"), Some(Duration::from_millis(100)));
        assert_eq!(client.generate("p").await, Err(InferenceError::Timeout));
    }

    #[tokio::test]
    async fn health_check_reports_reachability() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let client = HttpInferenceClient::new(&base, None);
        assert!(client.health_check().await);
        let captured = server.await.unwrap().unwrap();
        assert!(captured.request_line.starts_with("GET / "));

        let (base, _server) = serve_once("500 Internal Server Error", "{}").await;
        assert!(!HttpInferenceClient::new(&base, None).health_check().await);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        assert!(
            !HttpInferenceClient::new(&format!("http://{addr}"), None)
                .health_check()
                .await
        );
    }
}
