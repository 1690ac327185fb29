//! Completion backends.
//!
//! Provides the interface the daemon uses to turn a prompt into raw completion
//! text, an Ollama implementation, and a fake for tests. Calls are blocking: the
//! daemon runs them on a dedicated worker thread.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::config::OllamaConfig;

/// Completion errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Failed to generate from Ollama model: {0}")]
    Request(String),

    #[error("Failed to generate from Ollama model: HTTP {0}")]
    Status(u16),

    #[error("Failed to generate from Ollama model: invalid response: {0}")]
    InvalidResponse(String),
}

/// Anything that can complete a prompt
pub trait CompletionBackend: Send + Sync {
    /// Complete `prompt` and return the raw text.
    fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama `/api/generate` client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            url: config.generate_url(),
            model: config.model.clone(),
            timeout: config.request_timeout(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl CompletionBackend for OllamaClient {
    fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        // Built per call: a blocking client owns its own runtime and must not be
        // created or dropped on an async worker.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| BackendError::Client(e.to_string()))?;

        debug!("Generating with {} ({} prompt bytes)", self.model, prompt.len());

        let response = client
            .post(&self.url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| BackendError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(body.response.trim().to_string())
    }
}

/// Fake backend for testing
pub struct FakeBackend {
    responses: Mutex<Vec<Result<String, BackendError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeBackend {
    /// Create a fake backend with pre-defined responses.
    ///
    /// Responses are handed out in order; the last one repeats.
    pub fn new(responses: Vec<Result<String, BackendError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always complete with `text`
    pub fn always(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// Always fail with `error`
    pub fn failing(error: BackendError) -> Self {
        Self::new(vec![Err(error)])
    }

    /// Sleep before answering, to simulate a slow model
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completions requested so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CompletionBackend for FakeBackend {
    fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        let mut responses = self
            .responses
            .lock()
            .map_err(|_| BackendError::Request("fake backend poisoned".to_string()))?;

        match responses.len() {
            0 => Err(BackendError::InvalidResponse("no canned response".to_string())),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:9999".to_string(),
            model: "tiny".to_string(),
            ..OllamaConfig::default()
        };
        let client = OllamaClient::new(&config);
        assert_eq!(client.url, "http://127.0.0.1:9999/api/generate");
        assert_eq!(client.model(), "tiny");
    }

    #[test]
    fn test_generate_request_shape() {
        let body = serde_json::to_value(GenerateRequest {
            model: "gemma2:2b",
            prompt: "hi",
            stream: false,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "gemma2:2b", "prompt": "hi", "stream": false})
        );
    }

    #[test]
    fn test_generate_response_missing_field() {
        let body: GenerateResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert_eq!(body.response, "");
    }

    #[test]
    fn test_unreachable_backend_errors() {
        let config = OllamaConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_secs: 2,
            ..OllamaConfig::default()
        };
        let err = OllamaClient::new(&config).complete("hi").unwrap_err();
        assert!(matches!(err, BackendError::Request(_)));
        assert!(err.to_string().starts_with("Failed to generate from Ollama model"));
    }

    #[test]
    fn test_fake_backend_sequence() {
        let backend = FakeBackend::new(vec![
            Ok("first".to_string()),
            Err(BackendError::Status(500)),
            Ok("last".to_string()),
        ]);

        assert_eq!(backend.complete("").unwrap(), "first");
        assert!(backend.complete("").is_err());
        assert_eq!(backend.complete("").unwrap(), "last");
        assert_eq!(backend.complete("").unwrap(), "last");
        assert_eq!(backend.call_count(), 4);
    }

    #[test]
    fn test_fake_backend_failing() {
        let backend = FakeBackend::failing(BackendError::Status(503));
        let err = backend.complete("x").unwrap_err();
        assert_eq!(err.to_string(), "Failed to generate from Ollama model: HTTP 503");
    }
}
