//! LLM gateway: turns a transcript into one generated utterance.
//!
//! The call-site instruction travels as Gemini's `systemInstruction`; the
//! dialogue itself carries only user/model turns. A 503 from the vendor is
//! retried with a linearly growing delay, everything else fails at once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::GatewayError;
use crate::config::LlmConfig;
use crate::prompts::{CHAT_PROMPT, START_REQUEST};
use crate::transcript::{Role, Transcript, Utterance};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorPart {
    pub text: String,
}

/// One turn in the vendor's wire format. `role` is `user` or `model`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorTurn {
    pub role: String,
    pub parts: Vec<VendorPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<VendorTurn>,
}

/// Shape a dialogue for the vendor. System utterances are dropped from the
/// turn list; assistant turns become `model` turns.
pub fn shape_request(instruction: Option<&str>, context: &[Utterance]) -> VendorRequest {
    let contents = context
        .iter()
        .filter(|u| u.role != Role::System)
        .map(|u| VendorTurn {
            role: match u.role {
                Role::Assistant => "model".to_string(),
                _ => "user".to_string(),
            },
            parts: vec![VendorPart {
                text: u.content.clone(),
            }],
        })
        .collect();

    VendorRequest {
        system_instruction: instruction.map(str::to_string),
        contents,
    }
}

/// Performs a single generation request against the vendor.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn generate_content(&self, request: &VendorRequest) -> Result<String, GatewayError>;
}

/// Gemini `generateContent` over HTTPS.
pub struct GeminiTransport {
    client: Client,
    config: LlmConfig,
}

impl GeminiTransport {
    pub fn new(config: LlmConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LlmTransport for GeminiTransport {
    async fn generate_content(&self, request: &VendorRequest) -> Result<String, GatewayError> {
        if self.config.api_key.is_empty() {
            return Err(GatewayError::MissingApiKey("GEMINI_API_KEY"));
        }

        let mut body = json!({
            "contents": request.contents,
            "generationConfig": {
                "maxOutputTokens": self.config.max_tokens,
                "temperature": self.config.temperature,
            }
        });
        if let Some(instruction) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        debug!(
            "Sending {} turns to Gemini model '{}'",
            request.contents.len(),
            self.config.model
        );

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, text));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

/// Bounded attempts with `delay = attempt × base_delay` between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_ms),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Stateless across calls; the caller owns the transcript.
#[derive(Clone)]
pub struct LlmGateway {
    transport: Arc<dyn LlmTransport>,
    retry: RetryPolicy,
}

impl LlmGateway {
    pub fn new(transport: Arc<dyn LlmTransport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let transport = GeminiTransport::new(config.clone())?;
        Ok(Self::new(Arc::new(transport), RetryPolicy::from_config(config)))
    }

    /// Generate one utterance for `context`, retrying while the vendor is unavailable.
    pub async fn generate(
        &self,
        instruction: Option<&str>,
        context: &[Utterance],
    ) -> Result<String, GatewayError> {
        let request = shape_request(instruction, context);
        let mut attempt = 1;

        loop {
            match self.transport.generate_content(&request).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!("LLM request succeeded on attempt {attempt}");
                    }
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "LLM unavailable (attempt {attempt}/{}), retrying in {delay:?}",
                        self.retry.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Opening line of a session.
    pub async fn greet(&self) -> Result<String, GatewayError> {
        self.generate(Some(CHAT_PROMPT), &[Utterance::user(START_REQUEST)])
            .await
    }

    /// Next assistant turn. The transcript must already end with the user's message.
    pub async fn reply(&self, transcript: &Transcript) -> Result<String, GatewayError> {
        self.generate(Some(CHAT_PROMPT), transcript.utterances()).await
    }

    /// Single-shot completion of a rendered prompt.
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        self.generate(None, &[Utterance::user(prompt)]).await
    }
}
