//! Vision model boundary.
//!
//! The analysis capability is a black box behind [`ImageAnalyzer`]: it takes
//! image bytes and returns a text description, or fails. The production
//! implementation talks to an OpenAI-compatible chat completions endpoint;
//! tests substitute stubs.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::Config;
use crate::constants::ANALYSIS_PROMPT;

/// Classified upstream failures; all map to 502
#[derive(Error, Debug)]
pub enum AnalysisFailure {
    #[error("Analysis service unavailable: {0}")]
    Unavailable(String),

    #[error("Analysis service rejected the image: {0}")]
    RejectedContent(String),

    #[error("Analysis request timed out")]
    Timeout,
}

/// External capability that turns an image into a text description
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn describe(&self, image: &[u8], content_type: &str)
        -> Result<String, AnalysisFailure>;
}

/// Production analyzer backed by an OpenAI-compatible vision model
pub struct OpenAiVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiVision {
    /// Build the client with the configured request timeout
    ///
    /// The timeout bounds the whole upstream call; an expired deadline
    /// surfaces as [`AnalysisFailure::Timeout`], never a hang.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.analysis_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl ImageAnalyzer for OpenAiVision {
    async fn describe(
        &self,
        image: &[u8],
        content_type: &str,
    ) -> Result<String, AnalysisFailure> {
        // Images travel inline as base64 data URLs
        let data_url = format!("data:{};base64,{}", content_type, STANDARD.encode(image));

        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": 500,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisFailure::Timeout
                } else {
                    AnalysisFailure::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!("Vision model returned {}: {}", status, detail);

            if status.is_client_error() {
                return Err(AnalysisFailure::RejectedContent(format!(
                    "upstream status {}",
                    status
                )));
            }
            return Err(AnalysisFailure::Unavailable(format!(
                "upstream status {}",
                status
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AnalysisFailure::Unavailable(format!("malformed response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AnalysisFailure::Unavailable("empty completion".to_string()))
    }
}
