//! Config defaults: fills every field the user left out.

use crate::schema::{
    BrowserConfig, EnrichmentConfig, HuggingFaceConfig, LoggingConfig, PageSightConfig,
    ProvidersConfig, ScanConfig, SpeechConfig,
};

pub const DEFAULT_SPEECH_RATE: f32 = 1.0;
pub const DEFAULT_RATE_STEP: f32 = 0.4;

pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SCAN_RETRY_DELAY_MS: u64 = 500;

pub const DEFAULT_MIN_ALT_TEXT_LEN: usize = 5;
pub const DEFAULT_ITEM_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 60_000;

pub const DEFAULT_SUMMARIZE_MODEL: &str = "sshleifer/distilbart-cnn-12-6";
pub const DEFAULT_QA_MODEL: &str = "deepset/roberta-base-squad2";
pub const DEFAULT_CAPTION_MODEL: &str = "Salesforce/blip-image-captioning-base";
pub const DEFAULT_OCR_MODEL: &str = "microsoft/trocr-base-printed";

pub const DEFAULT_CDP_ENDPOINT: &str = "http://127.0.0.1:9222";
pub const DEFAULT_PDF_RENDER_DELAY_MS: u64 = 1_500;
pub const DEFAULT_CDP_CALL_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn apply_all_defaults(config: PageSightConfig) -> PageSightConfig {
    let config = apply_speech_defaults(config);
    let config = apply_scan_defaults(config);
    let config = apply_enrichment_defaults(config);
    let config = apply_provider_defaults(config);
    let config = apply_browser_defaults(config);
    apply_logging_defaults(config)
}

fn apply_speech_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let speech = config.speech.get_or_insert_with(SpeechConfig::default);
    speech.default_rate.get_or_insert(DEFAULT_SPEECH_RATE);
    speech.rate_step.get_or_insert(DEFAULT_RATE_STEP);
    config
}

fn apply_scan_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let scan = config.scan.get_or_insert_with(ScanConfig::default);
    scan.timeout_ms.get_or_insert(DEFAULT_SCAN_TIMEOUT_MS);
    scan.retry_delay_ms.get_or_insert(DEFAULT_SCAN_RETRY_DELAY_MS);
    config
}

fn apply_enrichment_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let enrichment = config.enrichment.get_or_insert_with(EnrichmentConfig::default);
    enrichment.min_alt_text_len.get_or_insert(DEFAULT_MIN_ALT_TEXT_LEN);
    enrichment.enrich_pdfs.get_or_insert(true);
    enrichment.item_timeout_ms.get_or_insert(DEFAULT_ITEM_TIMEOUT_MS);
    config
}

/// Model names are always filled; credentials never are.
fn apply_provider_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let providers = config.providers.get_or_insert_with(ProvidersConfig::default);
    providers.timeout_ms.get_or_insert(DEFAULT_PROVIDER_TIMEOUT_MS);

    let hf = providers.hugging_face.get_or_insert_with(HuggingFaceConfig::default);
    hf.summarize_model.get_or_insert_with(|| DEFAULT_SUMMARIZE_MODEL.to_string());
    hf.qa_model.get_or_insert_with(|| DEFAULT_QA_MODEL.to_string());
    hf.caption_model.get_or_insert_with(|| DEFAULT_CAPTION_MODEL.to_string());
    hf.ocr_model.get_or_insert_with(|| DEFAULT_OCR_MODEL.to_string());
    config
}

fn apply_browser_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let browser = config.browser.get_or_insert_with(BrowserConfig::default);
    browser.cdp_endpoint.get_or_insert_with(|| DEFAULT_CDP_ENDPOINT.to_string());
    browser.pdf_render_delay_ms.get_or_insert(DEFAULT_PDF_RENDER_DELAY_MS);
    browser.call_timeout_ms.get_or_insert(DEFAULT_CDP_CALL_TIMEOUT_MS);
    config
}

fn apply_logging_defaults(mut config: PageSightConfig) -> PageSightConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_every_section() {
        let cfg = apply_all_defaults(PageSightConfig::default());
        assert_eq!(cfg.speech.unwrap().rate_step, Some(DEFAULT_RATE_STEP));
        assert_eq!(cfg.scan.unwrap().timeout_ms, Some(DEFAULT_SCAN_TIMEOUT_MS));
        assert_eq!(cfg.enrichment.unwrap().min_alt_text_len, Some(5));
        assert_eq!(cfg.browser.unwrap().cdp_endpoint.as_deref(), Some(DEFAULT_CDP_ENDPOINT));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("info"));
        assert!(cfg.tts.is_none());
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = PageSightConfig::default();
        cfg.enrichment = Some(EnrichmentConfig {
            min_alt_text_len: Some(12),
            enrich_pdfs: Some(false),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        let enrichment = cfg.enrichment.unwrap();
        assert_eq!(enrichment.min_alt_text_len, Some(12));
        assert_eq!(enrichment.enrich_pdfs, Some(false));
        assert_eq!(enrichment.item_timeout_ms, Some(DEFAULT_ITEM_TIMEOUT_MS));
    }

    #[test]
    fn model_defaults_leave_token_unset() {
        let cfg = apply_all_defaults(PageSightConfig::default());
        let hf = cfg.providers.unwrap().hugging_face.unwrap();
        assert!(hf.token.is_none());
        assert_eq!(hf.qa_model.as_deref(), Some(DEFAULT_QA_MODEL));
    }
}
