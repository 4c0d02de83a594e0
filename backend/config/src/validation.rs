//! Config validation: deep schema checks with user-friendly error messages.

use crate::schema::{PageSightConfig, TtsKind, VisionKind};
use thiserror::Error;

const RATE_RANGE: std::ops::RangeInclusive<f32> = 0.5..=3.0;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &PageSightConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_speech(config, &mut report);
    validate_timing(config, &mut report);
    validate_providers(config, &mut report);
    validate_tts(config, &mut report);
    validate_browser(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_speech(config: &PageSightConfig, report: &mut ValidationReport) {
    let Some(speech) = &config.speech else { return };
    if let Some(rate) = speech.default_rate {
        if !RATE_RANGE.contains(&rate) {
            report.error(
                "speech.defaultRate",
                format!("Rate {rate} is outside {}..={}", RATE_RANGE.start(), RATE_RANGE.end()),
            );
        }
    }
    if let Some(step) = speech.rate_step {
        if step <= 0.0 {
            report.error("speech.rateStep", "rateStep must be > 0");
        } else if step > 1.0 {
            report.warn("speech.rateStep", "rateStep above 1.0 reaches the rate limits in one or two steps");
        }
    }
}

fn validate_timing(config: &PageSightConfig, report: &mut ValidationReport) {
    if let Some(scan) = &config.scan {
        if scan.timeout_ms == Some(0) {
            report.error("scan.timeoutMs", "timeoutMs must be > 0");
        }
    }
    if let Some(enrichment) = &config.enrichment {
        if enrichment.item_timeout_ms == Some(0) {
            report.error("enrichment.itemTimeoutMs", "itemTimeoutMs must be > 0");
        }
        if enrichment.min_alt_text_len == Some(0) {
            report.warn(
                "enrichment.minAltTextLen",
                "minAltTextLen 0 treats every image as described; nothing will be enriched",
            );
        }
    }
    if let Some(providers) = &config.providers {
        if providers.timeout_ms == Some(0) {
            report.error("providers.timeoutMs", "timeoutMs must be > 0");
        }
    }
}

fn validate_providers(config: &PageSightConfig, report: &mut ValidationReport) {
    let providers = config.providers.as_ref();
    let hf_token = providers
        .and_then(|p| p.hugging_face.as_ref())
        .and_then(|hf| hf.token.as_deref())
        .is_some_and(|t| !t.trim().is_empty());

    let vision_kind = providers
        .and_then(|p| p.vision.as_ref())
        .map(|v| v.kind)
        .unwrap_or_default();

    if let Some(vision) = providers.and_then(|p| p.vision.as_ref()) {
        let has_key = vision.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());
        match vision.kind {
            VisionKind::OpenAi | VisionKind::Gemini if !has_key => {
                report.error("providers.vision.apiKey", "apiKey is required for this vision provider");
            }
            VisionKind::HuggingFace if vision.api_key.is_some() => {
                report.warn(
                    "providers.vision.apiKey",
                    "Ignored for huggingFace; set providers.huggingFace.token instead",
                );
            }
            _ => {}
        }
    }

    if !hf_token {
        report.warn(
            "providers.huggingFace.token",
            "No Hugging Face token; summaries and answers will be unavailable",
        );
        if vision_kind == VisionKind::HuggingFace {
            report.warn("providers.vision", "No vision credentials; images will not be described");
        }
    }
}

fn validate_tts(config: &PageSightConfig, report: &mut ValidationReport) {
    let Some(tts) = &config.tts else { return };
    if matches!(tts.kind, TtsKind::OpenAi | TtsKind::ElevenLabs)
        && tts.api_key.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
    {
        report.error("tts.apiKey", "apiKey is required for this TTS provider");
    }
    if let Some(player) = &tts.player {
        if player.command.trim().is_empty() {
            report.error("tts.player.command", "Player command cannot be empty");
        }
        if tts.kind == TtsKind::Console {
            report.warn("tts.player", "Console speech does not play audio; player is ignored");
        }
    }
}

fn validate_browser(config: &PageSightConfig, report: &mut ValidationReport) {
    let Some(browser) = &config.browser else { return };
    if let Some(endpoint) = &browser.cdp_endpoint {
        if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
            report.error(
                "browser.cdpEndpoint",
                "Use the http:// debugging address; the WebSocket URL is discovered from it",
            );
        } else if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            report.error("browser.cdpEndpoint", format!("'{endpoint}' must start with http:// or https://"));
        }
    }
}

fn validate_logging(config: &PageSightConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else { return };
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        report.warn(
            "logging.level",
            format!("Unknown level '{level}'; it is passed to the env filter as a directive"),
        );
    }
}
