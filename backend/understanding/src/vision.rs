/// Vision understanding: captions and OCR from a vision-capable chat model.
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use pagesight_core::{CaptionProvider, ImageSource, OcrProvider};
use pagesight_logging::redact_sensitive_data;
use serde_json::Value;
use tracing::{debug, info};

use crate::fetch::{load_image, to_data_url};
use crate::ocr::{clean_ocr_output, OCR_PROMPT};

/// Instruction for alt-text style captions.
pub const CAPTION_PROMPT: &str = "Write one short sentence of alt text describing this image \
for a blind reader. Mention any visible text. Do not start with \"Image of\".";

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Supported vision providers.
#[derive(Debug, Clone)]
pub enum VisionProvider {
    OpenAI { api_key: String, model: String, base_url: String },
    Gemini { api_key: String, model: String, base_url: String },
}

impl VisionProvider {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAI {
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::Gemini {
            api_key: api_key.into(),
            model: "gemini-2.0-flash".to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, new_model: impl Into<String>) -> Self {
        match &mut self {
            Self::OpenAI { model, .. } | Self::Gemini { model, .. } => *model = new_model.into(),
        }
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            Self::OpenAI { base_url, .. } | Self::Gemini { base_url, .. } => {
                *base_url = url.into().trim_end_matches('/').to_string()
            }
        }
        self
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Gemini { .. } => "gemini",
        }
    }
}

/// Describe an image from raw bytes using a vision LLM.
pub async fn describe_image(
    http: &reqwest::Client,
    provider: &VisionProvider,
    image_bytes: &[u8],
    mime_type: &str,
    prompt: &str,
) -> Result<String> {
    match provider {
        VisionProvider::OpenAI { api_key, model, base_url } => {
            describe_via_openai(http, base_url, api_key, model, image_bytes, mime_type, prompt).await
        }
        VisionProvider::Gemini { api_key, model, base_url } => {
            describe_via_gemini(http, base_url, api_key, model, image_bytes, mime_type, prompt).await
        }
    }
}

async fn describe_via_openai(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    image_bytes: &[u8],
    mime_type: &str,
    prompt: &str,
) -> Result<String> {
    info!("[Vision] Describing image via OpenAI {}", model);
    let body = serde_json::json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": to_data_url(image_bytes, mime_type) } }
            ]
        }],
        "max_tokens": 512
    });
    let resp = http
        .post(format!("{base_url}/v1/chat/completions"))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("OpenAI vision error {}: {}", status, redact_sensitive_data(&text));
    }
    let json: Value = resp.json().await?;
    parse_openai_reply(&json)
}

async fn describe_via_gemini(
    http: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    image_bytes: &[u8],
    mime_type: &str,
    prompt: &str,
) -> Result<String> {
    info!("[Vision] Describing image via Gemini {}", model);
    let body = serde_json::json!({
        "contents": [{ "parts": [
            { "text": prompt },
            { "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(image_bytes) } }
        ]}]
    });
    let resp = http
        .post(format!("{base_url}/v1beta/models/{model}:generateContent"))
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("Gemini vision error {}: {}", status, redact_sensitive_data(&text));
    }
    let json: Value = resp.json().await?;
    parse_gemini_reply(&json)
}

fn parse_openai_reply(json: &Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("OpenAI vision reply had no content"))
}

fn parse_gemini_reply(json: &Value) -> Result<String> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| anyhow!("Gemini vision reply had no parts"))?;
    Ok(parts
        .iter()
        .filter_map(|p| p["text"].as_str())
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// One vision provider serving both captioning and OCR.
pub struct VisionClient {
    provider: VisionProvider,
    http: reqwest::Client,
}

impl VisionClient {
    pub fn new(provider: VisionProvider) -> Self {
        Self { provider, http: reqwest::Client::new() }
    }

    pub fn with_http(provider: VisionProvider, http: reqwest::Client) -> Self {
        Self { provider, http }
    }

    async fn ask(&self, image: &ImageSource, prompt: &str) -> Result<String> {
        let (data, mime) = load_image(&self.http, image).await?;
        debug!("[Vision] {} ({} bytes) to {}", image.describe(), data.len(), self.provider.name());
        describe_image(&self.http, &self.provider, &data, &mime, prompt).await
    }
}

#[async_trait]
impl CaptionProvider for VisionClient {
    async fn caption(&self, image: &ImageSource) -> Result<String> {
        let caption = self.ask(image, CAPTION_PROMPT).await?;
        if caption.is_empty() {
            bail!("{} returned an empty caption", self.provider.name());
        }
        Ok(caption)
    }
}

#[async_trait]
impl OcrProvider for VisionClient {
    async fn ocr(&self, image: &ImageSource) -> Result<String> {
        let raw = self.ask(image, OCR_PROMPT).await?;
        Ok(clean_ocr_output(&raw))
    }
}
