//! Question-answering fallback over an instant-answer web API.
//!
//! Sends the user's text as the `q` parameter and reads the `AbstractText`
//! field of the JSON reply.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Error, Debug)]
pub enum AnswerError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Answers free-form questions the keyword rules do not cover.
#[async_trait]
pub trait QuestionAnswering: Send + Sync {
    /// `Ok(None)` means the service had nothing to say.
    async fn answer(&self, question: &str) -> Result<Option<String>, AnswerError>;
}

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: Option<String>,
}

/// Client for the instant-answer API.
#[derive(Clone)]
pub struct InstantAnswerClient {
    client: Client,
    endpoint: String,
}

impl InstantAnswerClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point the client at another endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl Default for InstantAnswerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionAnswering for InstantAnswerClient {
    async fn answer(&self, question: &str) -> Result<Option<String>, AnswerError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", question), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnswerError::Status(status.as_u16()));
        }

        // The API labels its JSON as javascript, so decode the text ourselves.
        let body = response.text().await?;
        parse_instant_answer(&body)
    }
}

/// Pull the answer out of a response body. A missing or blank
/// `AbstractText` is no answer.
pub fn parse_instant_answer(body: &str) -> Result<Option<String>, AnswerError> {
    let parsed: InstantAnswer = serde_json::from_str(body)?;
    Ok(parsed
        .abstract_text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one HTTP response and hand back the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/x-javascript\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (format!("http://{addr}/"), server)
    }

    #[tokio::test]
    async fn test_answer_sends_raw_question_as_query() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"AbstractText": "Rust is a language."}"#).await;
        let client = InstantAnswerClient::new().with_endpoint(endpoint);

        let answer = client.answer("What Is Rust?").await.unwrap();
        assert_eq!(answer.as_deref(), Some("Rust is a language."));
        assert_eq!(
            server.await.unwrap(),
            "GET /?q=What+Is+Rust%3F&format=json HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_answer_blank_abstract_is_none() {
        let (endpoint, _server) = serve_once("200 OK", r#"{"AbstractText": ""}"#).await;
        let client = InstantAnswerClient::new().with_endpoint(endpoint);
        assert_eq!(client.answer("zzz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_answer_error_status() {
        let (endpoint, _server) = serve_once("503 Service Unavailable", "").await;
        let client = InstantAnswerClient::new().with_endpoint(endpoint);
        assert!(matches!(
            client.answer("anything").await,
            Err(AnswerError::Status(503))
        ));
    }

    #[test]
    fn test_parse_abstract_text() {
        let body = r#"{"AbstractText": "Rust is a programming language.", "Heading": "Rust"}"#;
        assert_eq!(
            parse_instant_answer(body).unwrap().as_deref(),
            Some("Rust is a programming language.")
        );
    }

    #[test]
    fn test_parse_missing_or_blank_is_none() {
        assert_eq!(parse_instant_answer(r#"{"Heading": ""}"#).unwrap(), None);
        assert_eq!(parse_instant_answer(r#"{"AbstractText": "  "}"#).unwrap(), None);
        assert_eq!(parse_instant_answer(r#"{"AbstractText": null}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_instant_answer("<html>rate limited</html>"),
            Err(AnswerError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        // Port 9 (discard) on localhost is not expected to speak HTTP
        let client = InstantAnswerClient::new().with_endpoint("http://127.0.0.1:9/");
        assert!(client.answer("anything").await.is_err());
    }
}
