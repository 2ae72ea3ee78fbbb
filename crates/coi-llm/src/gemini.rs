//! Gemini Provider Implementation
//!
//! Calls the Google Gemini `generateContent` REST API.
//!
//! # Features
//!
//! - Async HTTP communication with a blocking `LlmProvider` wrapper
//! - Configurable endpoint, model and generation settings
//! - HTTP status classification into transient and permanent errors
//!
//! # Examples
//!
//! ```no_run
//! use coi_llm::{GeminiConfig, GeminiProvider};
//! use coi_domain::traits::LlmProvider;
//!
//! let provider = GeminiProvider::new(GeminiConfig::default(), "api-key").unwrap();
//! let text = provider.generate("Summarize this certificate").unwrap();
//! ```

use crate::LlmError;
use coi_domain::traits::LlmProvider as LlmProviderTrait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Default Gemini API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default timeout for a single request (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Gemini provider settings
///
/// The API key is passed separately and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API base URL
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in a response
    pub max_output_tokens: u32,
    /// HTTP timeout per request (seconds)
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_output_tokens: 8192,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Gemini API provider
pub struct GeminiProvider {
    config: GeminiConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a new Gemini provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Authentication`] for an empty key and
    /// [`LlmError::Other`] when the HTTP client cannot be built.
    pub fn new(config: GeminiConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }

        // Idle connections are not pooled: the blocking wrapper may drive
        // each request on a different runtime.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    /// Model this provider talks to
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate text asynchronously
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The API is unreachable or times out (transient)
    /// - The API rate-limits the key (transient)
    /// - The key is rejected or the model does not exist
    /// - The response carries no text
    pub async fn generate_async(&self, prompt: &str, json_output: bool) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.config.endpoint, self.config.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: json_output.then_some("application/json"),
            },
        };

        debug!("POST {} ({} prompt chars)", url, prompt.len());
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status.as_u16(), &text, &self.config.model));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        response_text(parsed)
    }

    fn transport_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(Duration::from_secs(self.config.request_timeout_secs))
        } else {
            LlmError::Communication(format!("Request failed: {}", err))
        }
    }

    /// Drive a future to completion from synchronous code
    ///
    /// Must not be called from an async worker thread; the pipeline calls
    /// providers from `spawn_blocking`, where the ambient runtime is reused.
    fn block_on<F: Future>(&self, fut: F) -> Result<F::Output, LlmError> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Ok(handle.block_on(fut)),
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?;
                Ok(runtime.block_on(fut))
            }
        }
    }
}

/// Map a non-success HTTP status to an error
fn classify_status(status: u16, body: &str, model: &str) -> LlmError {
    match status {
        401 | 403 => LlmError::Authentication(format!("HTTP {}: {}", status, body)),
        404 => LlmError::ModelNotAvailable(model.to_string()),
        408 => LlmError::Communication(format!("HTTP {}: {}", status, body)),
        429 => LlmError::RateLimitExceeded,
        500..=599 => LlmError::Communication(format!("HTTP {}: {}", status, body)),
        _ => LlmError::InvalidResponse(format!("HTTP {}: {}", status, body)),
    }
}

/// Concatenate the text parts of the first candidate
fn response_text(response: GenerateResponse) -> Result<String, LlmError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(LlmError::InvalidResponse("response contains no text".to_string()))
    } else {
        Ok(text)
    }
}

impl LlmProviderTrait for GeminiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.block_on(self.generate_async(prompt, false))?
    }

    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error> {
        let prompt = format!(
            "{}\n\nRespond only with JSON matching this schema:\n{}",
            prompt, schema
        );
        self.block_on(self.generate_async(&prompt, true))?
    }
}
