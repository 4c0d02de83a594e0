//! Maps the loaded config onto the option structs of each crate.

use std::time::Duration;

use pagesight_browser::BridgeOptions;
use pagesight_config::defaults::*;
use pagesight_config::PageSightConfig;
use pagesight_controller::{ControllerOptions, ScanSettings};
use pagesight_core::AccessibilityPolicy;
use pagesight_pipeline::PipelineOptions;
use pagesight_understanding::HuggingFaceModels;

fn ms(value: Option<u64>, default: u64) -> Duration {
    Duration::from_millis(value.unwrap_or(default))
}

pub fn controller_options(config: &PageSightConfig) -> ControllerOptions {
    let speech = config.speech.clone().unwrap_or_default();
    let scan = config.scan.clone().unwrap_or_default();
    let enrichment = config.enrichment.clone().unwrap_or_default();
    let provider_timeout = config.providers.as_ref().and_then(|p| p.timeout_ms);

    ControllerOptions {
        default_rate: speech.default_rate.unwrap_or(DEFAULT_SPEECH_RATE),
        rate_step: speech.rate_step.unwrap_or(DEFAULT_RATE_STEP),
        scan: ScanSettings {
            timeout: ms(scan.timeout_ms, DEFAULT_SCAN_TIMEOUT_MS),
            retry_delay: ms(scan.retry_delay_ms, DEFAULT_SCAN_RETRY_DELAY_MS),
        },
        policy: AccessibilityPolicy {
            min_alt_text_len: enrichment.min_alt_text_len.unwrap_or(DEFAULT_MIN_ALT_TEXT_LEN),
        },
        pipeline: PipelineOptions {
            enrich_pdfs: enrichment.enrich_pdfs.unwrap_or(true),
            item_timeout: ms(enrichment.item_timeout_ms, DEFAULT_ITEM_TIMEOUT_MS),
        },
        provider_timeout: ms(provider_timeout, DEFAULT_PROVIDER_TIMEOUT_MS),
    }
}

pub fn bridge_options(config: &PageSightConfig) -> BridgeOptions {
    let browser = config.browser.clone().unwrap_or_default();
    BridgeOptions { pdf_render_delay: ms(browser.pdf_render_delay_ms, DEFAULT_PDF_RENDER_DELAY_MS) }
}

pub fn cdp_endpoint(config: &PageSightConfig) -> (String, Duration) {
    let browser = config.browser.clone().unwrap_or_default();
    (
        browser.cdp_endpoint.unwrap_or_else(|| DEFAULT_CDP_ENDPOINT.to_string()),
        ms(browser.call_timeout_ms, DEFAULT_CDP_CALL_TIMEOUT_MS),
    )
}

pub fn hugging_face_models(config: &PageSightConfig) -> HuggingFaceModels {
    let fallback = HuggingFaceModels::default();
    let Some(hf) = config.providers.as_ref().and_then(|p| p.hugging_face.clone()) else {
        return fallback;
    };
    HuggingFaceModels {
        summarize: hf.summarize_model.unwrap_or(fallback.summarize),
        qa: hf.qa_model.unwrap_or(fallback.qa),
        caption: hf.caption_model.unwrap_or(fallback.caption),
        ocr: hf.ocr_model.unwrap_or(fallback.ocr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesight_config::{apply_all_defaults, prepare_with};
    use std::collections::HashMap;

    #[test]
    fn defaults_match_crate_defaults() {
        let cfg = apply_all_defaults(PageSightConfig::default());
        let options = controller_options(&cfg);
        let expected = ControllerOptions::default();
        assert_eq!(options.default_rate, expected.default_rate);
        assert_eq!(options.rate_step, expected.rate_step);
        assert_eq!(options.scan.timeout, expected.scan.timeout);
        assert_eq!(options.policy, expected.policy);
        assert_eq!(options.pipeline.item_timeout, expected.pipeline.item_timeout);
        assert_eq!(bridge_options(&cfg).pdf_render_delay, BridgeOptions::default().pdf_render_delay);
        assert_eq!(hugging_face_models(&cfg), HuggingFaceModels::default());
    }

    #[test]
    fn user_values_flow_through() {
        let yaml = r#"
speech: { defaultRate: 1.4, rateStep: 0.2 }
scan: { timeoutMs: 1500 }
enrichment: { minAltTextLen: 10, enrichPdfs: false }
providers:
  huggingFace: { token: hf_x, qaModel: my/qa }
browser: { cdpEndpoint: "http://10.0.0.2:9222", callTimeoutMs: 2000 }
"#;
        let cfg = prepare_with(yaml, &HashMap::new()).unwrap();
        let options = controller_options(&cfg);
        assert_eq!(options.default_rate, 1.4);
        assert_eq!(options.rate_step, 0.2);
        assert_eq!(options.scan.timeout, Duration::from_millis(1500));
        assert_eq!(options.policy.min_alt_text_len, 10);
        assert!(!options.pipeline.enrich_pdfs);
        assert_eq!(hugging_face_models(&cfg).qa, "my/qa");
        let (endpoint, timeout) = cdp_endpoint(&cfg);
        assert_eq!(endpoint, "http://10.0.0.2:9222");
        assert_eq!(timeout, Duration::from_secs(2));
    }
}
