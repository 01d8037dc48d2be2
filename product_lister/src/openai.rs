//! OpenAI client that turns a UPC into product metadata
//!
//! Two reply formats are supported:
//! - `Structured`: chat completion in JSON mode, validated into `ProductMetadata`.
//! - `Lines`: legacy text completion, seven lines read by position.

use crate::error::{ListerError, Result};
use crate::models::{ProductMetadata, Upc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// OpenAI REST API root
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Fields every reply must carry, in order
const FIELD_COUNT: usize = 7;

/// How the model is asked to answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetadataFormat {
    #[default]
    Structured,
    Lines,
}

impl MetadataFormat {
    pub fn default_model(self) -> &'static str {
        match self {
            MetadataFormat::Structured => "gpt-4o-mini",
            MetadataFormat::Lines => "gpt-3.5-turbo-instruct",
        }
    }

    fn default_max_tokens(self) -> u32 {
        match self {
            MetadataFormat::Structured => 400,
            MetadataFormat::Lines => 150,
        }
    }
}

impl FromStr for MetadataFormat {
    type Err = ListerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "structured" | "json" => Ok(MetadataFormat::Structured),
            "lines" => Ok(MetadataFormat::Lines),
            other => Err(ListerError::Config(format!(
                "unknown metadata format {other:?} (expected structured or lines)"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct TextCompletionRequest<'a> {
    model: &'a str,
    prompt: String,
    max_tokens: u32,
    n: u32,
    stop: Option<&'a str>,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    n: u32,
    temperature: f64,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    message: Option<ChatMessage>,
}

/// Client for the OpenAI completion endpoints
pub struct OpenAiClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) format: MetadataFormat,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f64,
}

impl OpenAiClient {
    /// Creates a client using the default model for `format`.
    pub fn new(client: reqwest::Client, api_key: String, format: MetadataFormat) -> Self {
        log::debug!("Creating OpenAI client (key length: {})", api_key.len());
        Self {
            client,
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            model: format.default_model().to_string(),
            format,
            max_tokens: format.default_max_tokens(),
            temperature: 0.8,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Ask the model for metadata about `upc`
    pub async fn generate(&self, upc: &Upc) -> Result<ProductMetadata> {
        log::info!(
            "Generating metadata for UPC {} with {} ({:?})",
            upc,
            self.model,
            self.format
        );

        let metadata = match self.format {
            MetadataFormat::Lines => {
                let text = self.text_completion(upc).await?;
                parse_lines(&text)?
            }
            MetadataFormat::Structured => {
                let content = self.chat_completion(upc).await?;
                parse_structured(&content)?
            }
        };

        log::info!("Generated metadata: \"{}\" by {}", metadata.title, metadata.brand);
        Ok(metadata)
    }

    async fn text_completion(&self, upc: &Upc) -> Result<String> {
        let request = TextCompletionRequest {
            model: &self.model,
            prompt: metadata_prompt(upc),
            max_tokens: self.max_tokens,
            n: 1,
            stop: None,
            temperature: self.temperature,
        };

        let choice = self.post_completion("completions", &request).await?;
        choice.text.ok_or_else(|| {
            ListerError::MalformedResponse("completion choice has no text".to_string())
        })
    }

    async fn chat_completion(&self, upc: &Upc) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(
                        "You write product listings for a resale shop. Answer with JSON only."
                            .to_string(),
                    ),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(structured_prompt(upc)),
                },
            ],
            max_tokens: self.max_tokens,
            n: 1,
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let choice = self.post_completion("chat/completions", &request).await?;
        choice
            .message
            .and_then(|message| message.content)
            .ok_or_else(|| {
                ListerError::MalformedResponse("chat choice has no message content".to_string())
            })
    }

    async fn post_completion<T: Serialize>(
        &self,
        endpoint: &str,
        request: &T,
    ) -> Result<CompletionChoice> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("OpenAI request failed with status {}: {}", status, body);
            return Err(ListerError::HttpStatus { status, body });
        }

        let body = response.text().await?;
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| ListerError::MalformedResponse(format!("OpenAI response: {e}")))?;

        parsed.choices.into_iter().next().ok_or_else(|| {
            ListerError::MalformedResponse("OpenAI response has no choices".to_string())
        })
    }
}

/// Prompt used for the line-based reply
pub fn metadata_prompt(upc: &Upc) -> String {
    format!(
        "Generate a product title, description, brand, manufacturer, model number, MSRP, \
         and category for a product with UPC code {upc}."
    )
}

fn structured_prompt(upc: &Upc) -> String {
    format!(
        "{} Respond with a JSON object with exactly these string keys: title, description, \
         brand, manufacturer, model_number, msrp, category. msrp is a plain number in US \
         dollars without a currency symbol.",
        metadata_prompt(upc)
    )
}

/// Read the seven fields by position from a line-based reply
///
/// Lines past the seventh are ignored.
pub fn parse_lines(text: &str) -> Result<ProductMetadata> {
    let lines: Vec<&str> = text.trim().lines().collect();
    if lines.len() < FIELD_COUNT {
        return Err(ListerError::MalformedResponse(format!(
            "expected {FIELD_COUNT} lines of product metadata, got {}",
            lines.len()
        )));
    }
    if lines.len() > FIELD_COUNT {
        log::debug!("Ignoring {} extra line(s) in reply", lines.len() - FIELD_COUNT);
    }

    Ok(ProductMetadata {
        title: lines[0].to_string(),
        description: lines[1].to_string(),
        brand: lines[2].to_string(),
        manufacturer: lines[3].to_string(),
        model_number: lines[4].to_string(),
        msrp: lines[5].to_string(),
        category: lines[6].to_string(),
    })
}

/// Validate a JSON reply against the metadata schema
pub fn parse_structured(content: &str) -> Result<ProductMetadata> {
    serde_json::from_str(content.trim())
        .map_err(|e| ListerError::MalformedResponse(format!("product metadata JSON: {e}")))
}

#[cfg(test)]
#[path = "openai_tests.rs"]
mod tests;
