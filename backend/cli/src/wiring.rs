//! Builds the concrete collaborators from config.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use pagesight_browser::{CdpBridge, CdpClient};
use pagesight_config::{PageSightConfig, TtsKind, VisionKind};
use pagesight_controller::Collaborators;
use pagesight_core::{
    CaptionProvider, DocumentRasterizer, ImageSource, OcrProvider, QuestionAnswerer, SpeechEvent, SpeechId,
    SpeechOutput, Summarizer,
};
use pagesight_pipeline::EnrichmentProviders;
use pagesight_tts::{
    create_tts, AudioSink, CommandSink, ConsoleSpeech, SpeechChannel, TtsProvider, TtsProviderKind,
};
use pagesight_understanding::{HuggingFaceClient, VisionClient, VisionProvider};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::settings;

// ---------------------------------------------------------------------------
// Missing credentials
// ---------------------------------------------------------------------------

/// Stands in for a provider without credentials. Every call fails, which the
/// pipeline records as the sentinel description and the controller speaks
/// as unavailable.
pub struct Unconfigured {
    what: &'static str,
}

impl Unconfigured {
    pub fn new(what: &'static str) -> Self {
        Self { what }
    }
}

#[async_trait]
impl CaptionProvider for Unconfigured {
    async fn caption(&self, _image: &ImageSource) -> Result<String> {
        bail!("{} is not configured", self.what)
    }
}

#[async_trait]
impl OcrProvider for Unconfigured {
    async fn ocr(&self, _image: &ImageSource) -> Result<String> {
        bail!("{} is not configured", self.what)
    }
}

#[async_trait]
impl Summarizer for Unconfigured {
    async fn summarize(&self, _text: &str) -> Result<String> {
        bail!("{} is not configured", self.what)
    }
}

#[async_trait]
impl QuestionAnswerer for Unconfigured {
    async fn answer(&self, _question: &str, _context: &str) -> Result<String> {
        bail!("{} is not configured", self.what)
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

pub struct Providers {
    pub enrichment: EnrichmentProviders,
    pub summarizer: Arc<dyn Summarizer>,
    pub answerer: Arc<dyn QuestionAnswerer>,
}

pub fn build_providers(config: &PageSightConfig, bridge: Option<Arc<CdpBridge>>) -> Providers {
    let providers = config.providers.clone().unwrap_or_default();
    let hf = providers.hugging_face.clone().unwrap_or_default();

    let hugging_face = hf.token.filter(|t| !t.trim().is_empty()).map(|token| {
        let client = HuggingFaceClient::new(token, settings::hugging_face_models(config));
        Arc::new(match &hf.base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        })
    });

    let vision = providers.vision.unwrap_or_default();
    let image_client: Option<(Arc<dyn CaptionProvider>, Arc<dyn OcrProvider>)> = match vision.kind {
        VisionKind::HuggingFace => hugging_face
            .clone()
            .map(|c| (c.clone() as Arc<dyn CaptionProvider>, c as Arc<dyn OcrProvider>)),
        kind => vision.api_key.filter(|k| !k.trim().is_empty()).map(|key| {
            let mut provider = match kind {
                VisionKind::Gemini => VisionProvider::gemini(key),
                _ => VisionProvider::openai(key),
            };
            if let Some(model) = vision.model {
                provider = provider.with_model(model);
            }
            if let Some(url) = vision.base_url {
                provider = provider.with_base_url(url);
            }
            let client = Arc::new(VisionClient::new(provider));
            (client.clone() as Arc<dyn CaptionProvider>, client as Arc<dyn OcrProvider>)
        }),
    };

    let (caption, ocr) = image_client.unwrap_or_else(|| {
        warn!("[Setup] no vision provider configured; images will not be described");
        (
            Arc::new(Unconfigured::new("image captioning")) as Arc<dyn CaptionProvider>,
            Arc::new(Unconfigured::new("text recognition")) as Arc<dyn OcrProvider>,
        )
    });

    let (summarizer, answerer): (Arc<dyn Summarizer>, Arc<dyn QuestionAnswerer>) = match hugging_face {
        Some(client) => (
            client.clone() as Arc<dyn Summarizer>,
            client as Arc<dyn QuestionAnswerer>,
        ),
        None => (
            Arc::new(Unconfigured::new("summarization")) as Arc<dyn Summarizer>,
            Arc::new(Unconfigured::new("question answering")) as Arc<dyn QuestionAnswerer>,
        ),
    };

    Providers {
        enrichment: EnrichmentProviders {
            caption,
            ocr,
            rasterizer: bridge.map(|b| b as Arc<dyn DocumentRasterizer>),
        },
        summarizer,
        answerer,
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

pub fn build_speech(config: &PageSightConfig) -> (Arc<dyn SpeechOutput>, mpsc::UnboundedReceiver<SpeechEvent>) {
    let tts = config.tts.clone().unwrap_or_default();
    let api_key = tts.api_key.unwrap_or_default();
    let kind = match tts.kind {
        TtsKind::Console => {
            let (speech, events) = ConsoleSpeech::new();
            return (Arc::new(speech), events);
        }
        TtsKind::OpenAi => TtsProviderKind::OpenAi { api_key, voice: tts.voice },
        TtsKind::ElevenLabs => TtsProviderKind::ElevenLabs { api_key, voice_id: tts.voice },
    };

    let sink: Arc<dyn AudioSink> = match tts.player {
        Some(player) => Arc::new(CommandSink::new(player.command, player.args)),
        None => Arc::new(CommandSink::ffplay()),
    };
    let provider = create_tts(kind);
    info!("[Setup] speech via {}", provider.name());
    let (channel, events) = SpeechChannel::new(provider, sink);
    (Arc::new(channel), events)
}

/// Speech for one-shot commands: lines go to the log, stdout stays clean.
#[derive(Default)]
pub struct LoggedSpeech {
    next_id: AtomicU64,
}

#[async_trait]
impl SpeechOutput for LoggedSpeech {
    async fn speak(&self, text: &str, rate: f32) -> Result<SpeechId> {
        info!(rate, "[Speech] {}", text);
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

pub async fn connect_bridge(config: &PageSightConfig) -> Result<Arc<CdpBridge>> {
    let (endpoint, call_timeout) = settings::cdp_endpoint(config);
    let client = CdpClient::connect(&endpoint)
        .await
        .with_context(|| format!("connecting to Chrome at {endpoint}; is it running with --remote-debugging-port?"))?
        .with_call_timeout(call_timeout);
    info!("[Setup] connected to Chrome at {}", endpoint);
    Ok(Arc::new(CdpBridge::new(client, settings::bridge_options(config))))
}

pub fn collaborators(
    config: &PageSightConfig,
    bridge: Arc<CdpBridge>,
    speech: Arc<dyn SpeechOutput>,
) -> Collaborators {
    let providers = build_providers(config, Some(bridge.clone()));
    Collaborators {
        resolver: bridge.clone(),
        transport: bridge.clone(),
        executor: bridge,
        providers: providers.enrichment,
        summarizer: providers.summarizer,
        answerer: providers.answerer,
        speech,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesight_config::prepare_with;
    use std::collections::HashMap;

    #[tokio::test]
    async fn missing_credentials_fall_back_to_failing_providers() {
        let cfg = prepare_with("", &HashMap::new()).unwrap();
        let providers = build_providers(&cfg, None);
        let err = providers.summarizer.summarize("text").await.unwrap_err();
        assert!(err.to_string().contains("summarization is not configured"));
        let image = ImageSource::Url("https://x/a.png".into());
        assert!(providers.enrichment.caption.caption(&image).await.is_err());
        assert!(providers.enrichment.rasterizer.is_none());
    }

    #[tokio::test]
    async fn console_speech_is_the_default() {
        let cfg = prepare_with("", &HashMap::new()).unwrap();
        let (speech, mut events) = build_speech(&cfg);
        let id = speech.speak("hi", 3.0).await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event, SpeechEvent::Finished { id });
    }

    #[tokio::test]
    async fn logged_speech_hands_out_increasing_ids() {
        let speech = LoggedSpeech::default();
        let a = speech.speak("one", 1.0).await.unwrap();
        let b = speech.speak("two", 1.0).await.unwrap();
        assert!(b > a);
    }
}
