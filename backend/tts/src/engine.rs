/// TTS provider trait and implementations (ElevenLabs + OpenAI TTS).
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use pagesight_logging::redact_sensitive_data;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Audio format for TTS output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Wav,
}

impl AudioFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Wav => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Wav => "wav",
        }
    }
}

/// A TTS request. `rate` is the reader's speech rate, 1.0 being normal.
#[derive(Debug, Clone)]
pub struct TtsRequest {
    pub text: String,
    pub voice: Option<String>,
    pub format: AudioFormat,
    pub rate: f32,
}

impl TtsRequest {
    pub fn new(text: impl Into<String>, rate: f32) -> Self {
        Self { text: text.into(), voice: None, format: AudioFormat::Mp3, rate }
    }
}

/// Returns raw audio bytes.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, req: TtsRequest) -> Result<Bytes>;

    fn name(&self) -> &'static str;
}

async fn read_audio(provider: &str, resp: reqwest::Response) -> Result<Bytes> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        bail!("{} TTS error {}: {}", provider, status, redact_sensitive_data(&text));
    }
    Ok(resp.bytes().await?)
}

// ---------------------------------------------------------------------------
// OpenAI TTS
// ---------------------------------------------------------------------------

pub struct OpenAiTts {
    api_key: String,
    model: String,
    default_voice: String,
    base_url: String,
    client: Client,
}

impl OpenAiTts {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "tts-1".to_string(),
            default_voice: "nova".to_string(),
            base_url: "https://api.openai.com".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiTtsBody<'a> {
    model: &'a str,
    input: String,
    voice: String,
    response_format: &'static str,
    speed: f32,
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    async fn synthesize(&self, req: TtsRequest) -> Result<Bytes> {
        let body = OpenAiTtsBody {
            model: &self.model,
            input: req.text,
            voice: req.voice.unwrap_or_else(|| self.default_voice.clone()),
            response_format: req.format.extension(),
            // OpenAI accepts 0.25..=4.0
            speed: req.rate.clamp(0.25, 4.0),
        };
        info!("[TTS/OpenAI] Synthesizing with model={} speed={}", body.model, body.speed);
        let resp = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        read_audio("OpenAI", resp).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

// ---------------------------------------------------------------------------
// ElevenLabs TTS
// ---------------------------------------------------------------------------

pub struct ElevenLabsTts {
    api_key: String,
    default_voice_id: String,
    base_url: String,
    client: Client,
}

impl ElevenLabsTts {
    pub fn new(api_key: String, voice_id: Option<String>) -> Self {
        Self {
            api_key,
            default_voice_id: voice_id.unwrap_or_else(|| "21m00Tcm4TlvDq8ikWAM".to_string()), // Rachel
            base_url: "https://api.elevenlabs.io".to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct ElevenLabsBody {
    text: String,
    model_id: &'static str,
    voice_settings: ElevenLabsVoiceSettings,
}

#[derive(Serialize)]
struct ElevenLabsVoiceSettings {
    stability: f32,
    similarity_boost: f32,
    speed: f32,
}

#[async_trait]
impl TtsProvider for ElevenLabsTts {
    async fn synthesize(&self, req: TtsRequest) -> Result<Bytes> {
        let voice_id = req.voice.as_deref().unwrap_or(&self.default_voice_id);
        let url = format!("{}/v1/text-to-speech/{}/stream", self.base_url, voice_id);
        let body = ElevenLabsBody {
            text: req.text.clone(),
            model_id: "eleven_multilingual_v2",
            voice_settings: ElevenLabsVoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
                // ElevenLabs only accepts 0.7..=1.2
                speed: req.rate.clamp(0.7, 1.2),
            },
        };
        info!("[TTS/ElevenLabs] Synthesizing voice_id={}", voice_id);
        let resp = self.client.post(&url).header("xi-api-key", &self.api_key).json(&body).send().await?;
        read_audio("ElevenLabs", resp).await
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub enum TtsProviderKind {
    OpenAi { api_key: String, voice: Option<String> },
    ElevenLabs { api_key: String, voice_id: Option<String> },
}

pub fn create_tts(kind: TtsProviderKind) -> Arc<dyn TtsProvider> {
    match kind {
        TtsProviderKind::OpenAi { api_key, voice } => {
            let tts = OpenAiTts::new(api_key);
            Arc::new(match voice {
                Some(v) => tts.with_voice(v),
                None => tts,
            })
        }
        TtsProviderKind::ElevenLabs { api_key, voice_id } => Arc::new(ElevenLabsTts::new(api_key, voice_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn openai_speed_is_clamped_into_range() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/v1/audio/speech"))
            .and(matchers::body_partial_json(serde_json::json!({ "speed": 0.25, "voice": "nova" })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![9u8, 9]))
            .expect(1)
            .mount(&server)
            .await;

        let tts = OpenAiTts::new("sk-test".into()).with_base_url(server.uri());
        let audio = tts.synthesize(TtsRequest::new("hello", 0.1)).await.unwrap();
        assert_eq!(audio.as_ref(), &[9u8, 9]);
    }

    #[tokio::test]
    async fn elevenlabs_errors_surface_status() {
        let server = MockServer::start().await;
        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;
        let tts = ElevenLabsTts::new("k".into(), None).with_base_url(server.uri());
        let err = tts.synthesize(TtsRequest::new("hello", 1.0)).await.unwrap_err().to_string();
        assert!(err.contains("429"));
        assert!(err.contains("quota exceeded"));
    }
}
