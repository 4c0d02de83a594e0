//! PageSight runtime configuration schema.
//!
//! Every section and field is optional in the file; [`crate::apply_all_defaults`]
//! fills whatever the user left out.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSightConfig {
    /// Speaking rate and the step used by "faster"/"slower"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech: Option<SpeechConfig>,

    /// Page scanner request timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanConfig>,

    /// Interpretation pipeline settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<EnrichmentConfig>,

    /// Hosted model providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<ProvidersConfig>,

    /// Speech synthesis; absent means console output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsConfig>,

    /// Chrome DevTools connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Speech / scan / enrichment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_rate: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_step: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// How long one snapshot request may take before the scanner counts as absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentConfig {
    /// Alt text shorter than this (after trimming) counts as missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_alt_text_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrich_pdfs: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hugging_face: Option<HuggingFaceConfig>,
    /// Bound on summarize and question-answering calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisionKind {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
    /// Caption and OCR go to the Hugging Face image models
    #[default]
    HuggingFace,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    #[serde(default)]
    pub kind: VisionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuggingFaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarize_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocr_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// TTS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TtsKind {
    /// Print utterances instead of synthesizing audio
    #[default]
    Console,
    #[serde(rename = "openai")]
    OpenAi,
    ElevenLabs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    #[serde(default)]
    pub kind: TtsKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Voice name (OpenAI) or voice id (ElevenLabs)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerConfig>,
}

/// External audio player; synthesized audio is piped to its stdin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerConfig {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

// ---------------------------------------------------------------------------
// Browser / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// `http://host:port` of a Chrome started with `--remote-debugging-port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdp_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_render_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the daily JSON log; no file logging when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
speech:
  defaultRate: 1.2
providers:
  vision:
    kind: openai
    apiKey: sk-x
  huggingFace:
    qaModel: deepset/tinyroberta-squad2
tts:
  kind: elevenLabs
  player:
    command: mpv
    args: ["--no-video"]
"#;
        let cfg: PageSightConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.speech.unwrap().default_rate, Some(1.2));
        let providers = cfg.providers.unwrap();
        assert_eq!(providers.vision.as_ref().unwrap().kind, VisionKind::OpenAi);
        assert_eq!(
            providers.hugging_face.unwrap().qa_model.as_deref(),
            Some("deepset/tinyroberta-squad2")
        );
        let tts = cfg.tts.unwrap();
        assert_eq!(tts.kind, TtsKind::ElevenLabs);
        assert_eq!(tts.player.unwrap().args, vec!["--no-video"]);
    }

    #[test]
    fn unknown_vision_kind_is_rejected() {
        let yaml = "providers:\n  vision:\n    kind: clippy\n";
        assert!(serde_yaml::from_str::<PageSightConfig>(yaml).is_err());
    }

    #[test]
    fn empty_sections_are_not_serialized() {
        let yaml = serde_yaml::to_string(&PageSightConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
