//! Google Gemini collaborator.
//!
//! The request carries the persona instruction as `systemInstruction`, the
//! strictly role-alternating transcript as `contents`, and safety thresholds
//! pinned to their most permissive level so hostile moderation output is not
//! blocked by the provider itself.

use crate::error::LlmError;
use crate::http::build_client;
use reqwest::Client;

mod types;
pub use types::{ChatTurn, TurnRole};
use types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    SafetySetting,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";

/// Bounded timeout on model invocation; a timeout surfaces as a normal
/// generation failure.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

pub struct GeminiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the client at an alternate endpoint (used by tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            client: build_client(REQUEST_TIMEOUT_SECS),
        }
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request(system_instruction: &str, transcript: &[ChatTurn]) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: transcript
                .iter()
                .map(|turn| Content {
                    role: Some(turn.role.as_str().to_string()),
                    parts: vec![Part {
                        text: turn.text.clone(),
                    }],
                })
                .collect(),
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            }),
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: 0.9,
                max_output_tokens: 1024,
            },
        }
    }

    fn extract_text(result: &GenerateContentResponse) -> Result<String, LlmError> {
        let text = result
            .candidates
            .as_deref()
            .and_then(|c| c.first())
            .map(|candidate| {
                let mut out = String::new();
                for part in &candidate.content.parts {
                    if let Some(t) = &part.text {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        out.push_str(t);
                    }
                }
                out
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }

    /// Submit the system instruction plus transcript and return the generated
    /// reply text.
    pub async fn generate(
        &self,
        system_instruction: &str,
        transcript: &[ChatTurn],
    ) -> Result<String, LlmError> {
        let request = Self::build_request(system_instruction, transcript);

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, message });
        }

        let result: GenerateContentResponse = response.json().await?;
        Self::extract_text(&result)
    }
}
