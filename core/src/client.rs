//! Google Generative AI client for plan generation.
//!
//! All three operations go through the non-streaming `generateContent`
//! endpoint with a pinned JSON response schema. Plan and replan calls retry
//! with exponential backoff; stuck suggestions are best-effort and fall back
//! to canned text instead of failing.

use momentum_protocol::{Chunk, Plan};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;
use crate::prompts;
use crate::retry::{self, RetryConfig};

/// Google Generative AI API base URL.
const GOOGLE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Configuration for the generation client.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model to use (e.g., "gemini-2.5-flash").
    pub model: String,
    /// API base URL, overridable for tests.
    pub base_url: String,
    /// Maximum tokens to generate.
    pub max_output_tokens: u32,
    /// Sampling temperature for plan and replan calls.
    pub plan_temperature: f32,
    /// Sampling temperature for stuck-suggestion calls.
    pub suggestion_temperature: f32,
    /// Retry policy for plan and replan calls.
    pub retry: RetryConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            base_url: GOOGLE_API_BASE.to_string(),
            max_output_tokens: 8192,
            plan_temperature: 0.7,
            suggestion_temperature: 0.8,
            retry: RetryConfig::default(),
        }
    }
}

/// Google error response format.
#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

/// Google error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

/// Non-streaming `generateContent` response.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Client for the Google Generative AI API.
pub struct GenerationClient {
    /// HTTP client for API requests.
    client: reqwest::Client,
    api_key: String,
    config: GenerationConfig,
}

impl GenerationClient {
    /// Creates a new client authenticated with `api_key`.
    pub fn new(api_key: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            config,
        }
    }

    /// Creates a client with a custom HTTP client.
    ///
    /// Useful for testing or custom configurations.
    pub fn with_client(
        client: reqwest::Client,
        api_key: impl Into<String>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            config,
        }
    }

    /// Generates a fresh plan for `goal_text`.
    ///
    /// Retries per the configured policy. `cancel` is checked before each
    /// attempt, after each response arrives, and during backoff waits; once
    /// it fires the call returns [`GenerationError::Cancelled`] and any
    /// response still in flight is discarded.
    pub async fn generate_plan(
        &self,
        goal_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Plan, GenerationError> {
        let user_text = prompts::plan_user_text(goal_text);
        retry::run_with_backoff(
            || self.fetch_plan(prompts::PLAN_INSTRUCTION, &user_text, cancel),
            &self.config.retry,
            cancel,
        )
        .await
    }

    /// Generates a replacement plan for `goal_text` that must carry every
    /// chunk in `locked_chunks` through verbatim.
    ///
    /// The locked chunks ride along in the prompt as JSON; whether the model
    /// honored them is judged by the caller (the diff makes preserved chunks
    /// show up as unchanged). Retry and cancellation behave as in
    /// [`GenerationClient::generate_plan`].
    pub async fn generate_replan(
        &self,
        goal_text: &str,
        locked_chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Result<Plan, GenerationError> {
        let locked_json = serde_json::to_string_pretty(locked_chunks).map_err(|e| {
            GenerationError::InvalidConfig(format!("could not encode locked chunks: {e}"))
        })?;
        let user_text = prompts::replan_user_text(goal_text, &locked_json);
        retry::run_with_backoff(
            || self.fetch_plan(prompts::REPLAN_INSTRUCTION, &user_text, cancel),
            &self.config.retry,
            cancel,
        )
        .await
    }

    /// Suggests 2-3 ways to get moving again on `chunk`.
    ///
    /// Best effort: a single attempt, no retries, and any failure (or an
    /// empty reply) yields the canned fallback suggestions. This call never
    /// errors; being stuck should not depend on the network cooperating.
    pub async fn generate_stuck_suggestions(&self, goal_text: &str, chunk: &Chunk) -> Vec<String> {
        match self.fetch_suggestions(goal_text, chunk).await {
            Ok(suggestions) if !suggestions.is_empty() => suggestions,
            Ok(_) => {
                tracing::debug!("suggestion response was empty; using fallback");
                Self::fallback_suggestions()
            }
            Err(err) => {
                tracing::warn!(error = %err, "suggestion generation failed; using fallback");
                Self::fallback_suggestions()
            }
        }
    }

    async fn fetch_plan(
        &self,
        instruction: &str,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Plan, GenerationError> {
        let value = self
            .request_json(
                instruction,
                user_text,
                self.config.plan_temperature,
                prompts::plan_response_schema(),
                cancel,
            )
            .await?;
        Plan::from_json_value(value).map_err(|e| GenerationError::Validation(e.to_string()))
    }

    async fn fetch_suggestions(
        &self,
        goal_text: &str,
        chunk: &Chunk,
    ) -> Result<Vec<String>, GenerationError> {
        let chunk_json = serde_json::to_string_pretty(chunk)
            .map_err(|e| GenerationError::InvalidConfig(format!("could not encode chunk: {e}")))?;
        let user_text = prompts::suggestions_user_text(goal_text, &chunk_json);
        // Suggestions are not cancellable from the UI, so the token is inert.
        let cancel = CancellationToken::new();
        let value = self
            .request_json(
                prompts::SUGGESTIONS_INSTRUCTION,
                &user_text,
                self.config.suggestion_temperature,
                prompts::suggestions_response_schema(),
                &cancel,
            )
            .await?;
        let suggestions = value.get("suggestions").and_then(Value::as_array).ok_or_else(|| {
            GenerationError::Validation("response has no `suggestions` array".to_string())
        })?;
        Ok(suggestions
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    /// Sends one `generateContent` request and returns the JSON value parsed
    /// out of the first candidate's text.
    async fn request_json(
        &self,
        instruction: &str,
        user_text: &str,
        temperature: f32,
        response_schema: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, GenerationError> {
        let body = self.build_request_body(instruction, user_text, temperature, response_schema);
        let url = format!(
            "{}/{}:generateContent",
            self.config.base_url, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .headers(self.request_headers()?)
            .json(&body)
            .send()
            .await?;
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        // Check for error response
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();

            // Try to parse as Google error
            let (code, message) = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(envelope) => (
                    envelope.error.code.unwrap_or(status.as_u16()),
                    envelope.error.message,
                ),
                Err(_) => (status.as_u16(), error_text),
            };
            if (400..500).contains(&code) {
                return Err(GenerationError::Client {
                    status: code,
                    message,
                });
            }
            return Err(GenerationError::Transient {
                status: code,
                message,
            });
        }

        let text = response.text().await?;
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let decoded: GenerateResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Validation(format!("response is not a generateContent payload: {e}"))
        })?;
        Self::parse_candidate_json(decoded)
    }

    /// Pulls the first candidate's text out of a response and parses it as
    /// JSON. The response schema makes the model emit a bare JSON document
    /// as the candidate text.
    fn parse_candidate_json(response: GenerateResponse) -> Result<Value, GenerationError> {
        let text = response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                GenerationError::Validation("response carries no candidate text".to_string())
            })?;
        serde_json::from_str(&text).map_err(|e| {
            GenerationError::Validation(format!("candidate text is not valid JSON: {e}"))
        })
    }

    /// Builds the request body for the Generative AI API.
    fn build_request_body(
        &self,
        instruction: &str,
        user_text: &str,
        temperature: f32,
        response_schema: Value,
    ) -> Value {
        json!({
            "systemInstruction": {
                "parts": [{ "text": instruction }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": user_text }]
            }],
            "generationConfig": {
                "maxOutputTokens": self.config.max_output_tokens,
                "temperature": temperature,
                "responseMimeType": "application/json",
                "responseSchema": response_schema
            }
        })
    }

    fn request_headers(&self) -> Result<HeaderMap, GenerationError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key).map_err(|_| {
                GenerationError::InvalidConfig("API key is not a valid header value".to_string())
            })?,
        );
        Ok(headers)
    }

    fn fallback_suggestions() -> Vec<String> {
        prompts::FALLBACK_SUGGESTIONS
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}
