use std::time::Duration;

use itertools::Itertools;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the service gave back for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    /// Nothing generated; the service withheld the response.
    Blocked { reason: Option<String> },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One synchronous text generation call.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<Generation, GenerationError>;
}

impl<T: TextGenerator + ?Sized> TextGenerator for &T {
    fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        (**self).generate(prompt)
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Text parts of the first candidate, or the reason nothing came back.
pub fn classify(response: GenerateResponse) -> Generation {
    let first = response.candidates.into_iter().next();
    let texts: Vec<String> = first
        .as_ref()
        .and_then(|c| c.content.as_ref())
        .map(|content| content.parts.iter().filter_map(|p| p.text.clone()).collect())
        .unwrap_or_default();

    if !texts.is_empty() {
        return Generation::Text(texts.into_iter().join(""));
    }

    let reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .or_else(|| first.and_then(|c| c.finish_reason));
    Generation::Blocked { reason }
}

/// Client for the Generative Language `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(GeminiClient {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                model
            ),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }
        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        Ok(classify(parsed))
    }
}
