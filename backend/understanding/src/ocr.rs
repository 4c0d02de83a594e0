//! Optical character recognition through a vision model.
//!
//! The model is asked to transcribe verbatim and to answer with a fixed
//! marker when the image holds no text; the marker maps to an empty result.

/// Instruction sent alongside the image.
pub const OCR_PROMPT: &str = "Transcribe all readable text in this image exactly as written, \
preserving line breaks. Do not describe the image. If there is no readable text, reply with NO_TEXT.";

const NO_TEXT_MARKER: &str = "NO_TEXT";

/// Strip model chatter and the no-text marker from an OCR reply.
pub fn clean_ocr_output(raw: &str) -> String {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
        .map(|inner| match inner.split_once('\n') {
            // Opening fence line may carry a language tag.
            Some((tag, body)) if !tag.trim().contains(' ') => body.trim(),
            _ => inner.trim(),
        })
        .unwrap_or(trimmed);
    if unfenced.trim_end_matches('.').eq_ignore_ascii_case(NO_TEXT_MARKER) {
        return String::new();
    }
    unfenced
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
