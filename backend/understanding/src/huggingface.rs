//! Hugging Face Inference router client.
//!
//! Summarization and extractive question answering go through JSON tasks;
//! captioning and OCR upload the raw image to an image-to-text model. A 503
//! means the model is still loading, which callers treat like any other
//! provider failure.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use pagesight_core::{CaptionProvider, ImageSource, OcrProvider, QuestionAnswerer, Summarizer};
use pagesight_logging::redact_sensitive_data;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::fetch::load_image;

const ROUTER_BASE_URL: &str = "https://router.huggingface.co/hf-inference/models";

/// Inputs longer than this are cut before summarizing; the default model
/// truncates anyway and large bodies only slow the request down.
const MAX_SUMMARY_INPUT_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuggingFaceModels {
    pub summarize: String,
    pub qa: String,
    pub caption: String,
    pub ocr: String,
}

impl Default for HuggingFaceModels {
    fn default() -> Self {
        Self {
            summarize: "sshleifer/distilbart-cnn-12-6".to_string(),
            qa: "deepset/roberta-base-squad2".to_string(),
            caption: "Salesforce/blip-image-captioning-base".to_string(),
            ocr: "microsoft/trocr-base-printed".to_string(),
        }
    }
}

pub struct HuggingFaceClient {
    token: String,
    models: HuggingFaceModels,
    base_url: String,
    http: reqwest::Client,
}

impl HuggingFaceClient {
    pub fn new(token: impl Into<String>, models: HuggingFaceModels) -> Self {
        Self {
            token: token.into(),
            models,
            base_url: ROUTER_BASE_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn models(&self) -> &HuggingFaceModels {
        &self.models
    }

    fn url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    /// POST a JSON task, asking the router to wait for a cold model.
    async fn query(&self, model: &str, mut payload: Value) -> Result<Value> {
        payload["options"] = serde_json::json!({ "wait_for_model": true });
        let resp = self
            .http
            .post(self.url(model))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;
        read_json(model, resp).await
    }

    /// POST raw image bytes to an image-to-text model.
    async fn image_to_text(&self, model: &str, image: &ImageSource) -> Result<String> {
        let (data, mime) = load_image(&self.http, image).await?;
        debug!("[HuggingFace] {} ({} bytes) to {}", image.describe(), data.len(), model);
        let resp = self
            .http
            .post(self.url(model))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(data)
            .send()
            .await?;
        let json = read_json(model, resp).await?;
        first_field(&json, "generated_text")
    }
}

async fn read_json(model: &str, resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        bail!("model {} is loading", model);
    }
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("Hugging Face error {} from {}: {}", status, model, redact_sensitive_data(&text));
    }
    Ok(resp.json().await?)
}

/// Pull `field` out of `[{field: ...}]` or `{field: ...}`.
fn first_field(json: &Value, field: &str) -> Result<String> {
    let value = match json {
        Value::Array(items) => items.first().and_then(|v| v.get(field)),
        other => other.get(field),
    };
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("Hugging Face reply missing {}", field))
}

fn clip_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Summarizer for HuggingFaceClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        info!("[HuggingFace] Summarizing {} chars via {}", text.len(), self.models.summarize);
        let input = clip_chars(text, MAX_SUMMARY_INPUT_CHARS);
        let json = self.query(&self.models.summarize, serde_json::json!({ "inputs": input })).await?;
        first_field(&json, "summary_text")
    }
}

#[async_trait]
impl QuestionAnswerer for HuggingFaceClient {
    async fn answer(&self, question: &str, context: &str) -> Result<String> {
        info!("[HuggingFace] Answering {:?} via {}", question, self.models.qa);
        let payload = serde_json::json!({ "inputs": { "question": question, "context": context } });
        let json = self.query(&self.models.qa, payload).await?;
        first_field(&json, "answer")
    }
}

#[async_trait]
impl CaptionProvider for HuggingFaceClient {
    async fn caption(&self, image: &ImageSource) -> Result<String> {
        let caption = self.image_to_text(&self.models.caption, image).await?;
        if caption.is_empty() {
            bail!("{} returned an empty caption", self.models.caption);
        }
        Ok(caption)
    }
}

#[async_trait]
impl OcrProvider for HuggingFaceClient {
    async fn ocr(&self, image: &ImageSource) -> Result<String> {
        self.image_to_text(&self.models.ocr, image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HuggingFaceClient {
        HuggingFaceClient::new("hf_test", HuggingFaceModels::default()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn summarize_reads_summary_text() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/sshleifer/distilbart-cnn-12-6"))
            .and(matchers::body_partial_json(serde_json::json!({ "options": { "wait_for_model": true } })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "summary_text": " Free shipping over $50. " }])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let summary = client(&server).summarize("long page text").await.unwrap();
        assert_eq!(summary, "Free shipping over $50.");
    }

    #[tokio::test]
    async fn answer_reads_answer_field() {
        let server = MockServer::start().await;
        Mock::given(matchers::path("/deepset/roberta-base-squad2"))
            .and(matchers::body_partial_json(serde_json::json!({
                "inputs": { "question": "shipping", "context": "Shipping is free." }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "answer": "free", "score": 0.9 })),
            )
            .mount(&server)
            .await;

        let answer = client(&server).answer("shipping", "Shipping is free.").await.unwrap();
        assert_eq!(answer, "free");
    }

    #[tokio::test]
    async fn loading_model_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let err = client(&server).summarize("text").await.unwrap_err();
        assert!(err.to_string().contains("loading"));
    }

    #[tokio::test]
    async fn caption_uploads_bytes() {
        let server = MockServer::start().await;
        Mock::given(matchers::path("/Salesforce/blip-image-captioning-base"))
            .and(matchers::header("content-type", "image/png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "generated_text": "a cat on a sofa" }])),
            )
            .mount(&server)
            .await;

        let caption = client(&server).caption(&ImageSource::png(vec![1u8, 2])).await.unwrap();
        assert_eq!(caption, "a cat on a sofa");
    }

    #[test]
    fn clipping_respects_char_boundaries() {
        assert_eq!(clip_chars("héllo", 2), "hé");
        assert_eq!(clip_chars("hi", 10), "hi");
    }
}
