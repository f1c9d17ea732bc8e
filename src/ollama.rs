//! Ollama backend client.
//!
//! A thin wrapper over the local `/api/generate` endpoint. The response is
//! newline-delimited JSON; each line carries a `response` fragment and the
//! full output is the concatenation of fragments. There is exactly one
//! outstanding request at a time and no retry: the timeout is minutes long
//! to survive cold starts of a large model, and a failed call just leaves
//! the entry untranslated for this pass.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Backend call failure classification.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to send request to translation backend: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Translation backend error ({status}): {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: GenerateOptions,
    keep_alive: &'static str,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_thread: u32,
    num_ctx: u32,
}

/// `keep_alive: 0` asks the server to evict the model immediately.
#[derive(Debug, Serialize)]
struct UnloadRequest<'a> {
    model: &'a str,
    keep_alive: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: Option<String>,
}

/// HTTP client for the translation backend.
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    num_thread: u32,
    num_ctx: u32,
}

impl OllamaClient {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.ollama_url.clone(),
            num_thread: config.num_thread,
            num_ctx: config.num_ctx,
        })
    }

    /// Run one generation request and return the concatenated output.
    ///
    /// Temperature is pinned to zero: translation wants determinism, not
    /// creativity. Lines that fail to parse are skipped; the stream often
    /// ends with a non-fragment status object.
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model,
            prompt,
            options: GenerateOptions {
                temperature: 0.0,
                num_thread: self.num_thread,
                num_ctx: self.num_ctx,
            },
            keep_alive: "5m",
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        let raw = response.text().await?;
        let mut result = String::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<GenerateLine>(line) {
                Ok(parsed) => {
                    if let Some(fragment) = parsed.response {
                        result.push_str(&fragment);
                    }
                }
                Err(e) => debug!("Skipping malformed stream line: {}", e),
            }
        }

        Ok(result.trim().to_string())
    }

    /// Ask the server to drop `model` from memory. Used when switching model
    /// groups; failure is reported to the caller but is never fatal.
    pub async fn unload(&self, model: &str) -> Result<(), BackendError> {
        let request = UnloadRequest {
            model,
            keep_alive: 0,
        };
        let response = self.client.post(&self.url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }
        Ok(())
    }

    /// Cheap reachability probe; any successful response counts.
    pub async fn is_running(&self, model: &str) -> bool {
        let request = GenerateRequest {
            model,
            prompt: "ping",
            options: GenerateOptions {
                temperature: 0.0,
                num_thread: self.num_thread,
                num_ctx: self.num_ctx,
            },
            keep_alive: "5m",
        };
        match self.client.post(&self.url).json(&request).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
