/// Utterance classification: one pass over the intent table.
use crate::registry::{IntentRegistry, SEARCH_PHRASES};
use crate::types::{Intent, IntentCategory, RateDirection};

/// Lowercase, trim, and drop trailing punctuation from a raw transcript.
pub fn normalize_utterance(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .trim()
        .to_lowercase()
}

/// Whitespace tokens with surrounding punctuation removed, for matching.
fn match_tokens(utterance: &str) -> Vec<String> {
    utterance
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .collect()
}

/// Position of the first whole-word occurrence of `phrase` in `tokens`.
fn find_phrase(tokens: &[String], phrase: &str) -> Option<usize> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.is_empty() || words.len() > tokens.len() {
        return None;
    }
    tokens
        .windows(words.len())
        .position(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}

fn contains_phrase(tokens: &[String], phrase: &str) -> bool {
    find_phrase(tokens, phrase).is_some()
}

/// Classify an utterance. The first rule (in table order) with a matching
/// phrase decides the intent.
pub fn classify(utterance: &str, registry: &IntentRegistry) -> Intent {
    let tokens = match_tokens(utterance);
    let category = registry
        .rules()
        .iter()
        .find(|rule| rule.phrases.iter().any(|p| contains_phrase(&tokens, p)))
        .map(|rule| rule.category);

    match category {
        Some(IntentCategory::Stop) => Intent::Stop,
        Some(IntentCategory::Faster) => Intent::ChangeRate { direction: RateDirection::Faster },
        Some(IntentCategory::Slower) => Intent::ChangeRate { direction: RateDirection::Slower },
        Some(IntentCategory::Summarize) => Intent::Summarize,
        Some(IntentCategory::NavTop) => Intent::NavTop,
        Some(IntentCategory::NavBottom) => Intent::NavBottom,
        Some(IntentCategory::NextImage) => Intent::NextImage,
        Some(IntentCategory::ReadHeadings) => Intent::ReadHeadings,
        Some(IntentCategory::ReadContent) => Intent::ReadContent,
        Some(IntentCategory::Search) => Intent::Search { query: extract_search_query(utterance) },
        None => Intent::Unrecognized,
    }
}

/// True if the utterance contains a word allowed to barge in on speech.
pub fn is_interrupting(utterance: &str, registry: &IntentRegistry) -> bool {
    let tokens = match_tokens(utterance);
    registry
        .interrupt_keywords()
        .iter()
        .any(|k| contains_phrase(&tokens, k))
}

/// Strip everything up to and including the earliest search command phrase,
/// plus a connecting "for" / "the". The query itself is not validated.
///
/// "find shipping policy", "where is shipping policy" and
/// "search for shipping policy" all yield "shipping policy".
pub fn extract_search_query(utterance: &str) -> String {
    let raw: Vec<&str> = utterance.split_whitespace().collect();
    let tokens = match_tokens(utterance);

    let cut = SEARCH_PHRASES
        .iter()
        .filter_map(|p| find_phrase(&tokens, p).map(|at| (at, at + p.split_whitespace().count())))
        .min_by_key(|(at, _)| *at)
        .map(|(_, end)| end)
        .unwrap_or(0);

    let mut rest = &raw[cut..];
    while let Some(first) = rest.first() {
        let word = first.to_lowercase();
        if word == "for" || word == "the" {
            rest = &rest[1..];
        } else {
            break;
        }
    }
    rest.join(" ")
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ','))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_default(u: &str) -> Intent {
        classify(u, &IntentRegistry::new())
    }

    #[test]
    fn search_prefixes_strip_to_same_query() {
        for prefix in ["find", "search", "where is", "show me"] {
            let u = format!("{prefix} shipping policy");
            assert_eq!(extract_search_query(&u), "shipping policy", "prefix {prefix}");
        }
        assert_eq!(extract_search_query("search for shipping policy"), "shipping policy");
        assert_eq!(extract_search_query("please look for the refund form"), "refund form");
    }

    #[test]
    fn search_query_keeps_symbols() {
        assert_eq!(extract_search_query("find $5 coupons"), "$5 coupons");
        assert_eq!(extract_search_query("find"), "");
    }

    #[test]
    fn stop_beats_everything() {
        assert_eq!(classify_default("stop and scroll to top"), Intent::Stop);
        assert_eq!(classify_default("shut up"), Intent::Stop);
    }

    #[test]
    fn whole_word_matching() {
        // "stop" contains "top" and "desktop" contains "top"; neither is navigation.
        assert_eq!(classify_default("stop"), Intent::Stop);
        assert_eq!(classify_default("desktop"), Intent::Unrecognized);
    }

    #[test]
    fn precedence_resolves_overlaps() {
        assert_eq!(classify_default("summary of the top section"), Intent::Summarize);
        assert_eq!(classify_default("show me the top"), Intent::NavTop);
        assert_eq!(classify_default("find image"), Intent::NextImage);
        assert_eq!(classify_default("read headings"), Intent::ReadHeadings);
        assert_eq!(classify_default("read the page"), Intent::ReadContent);
        assert_eq!(
            classify_default("speed up"),
            Intent::ChangeRate { direction: RateDirection::Faster }
        );
        assert_eq!(
            classify_default("find shipping policy"),
            Intent::Search { query: "shipping policy".into() }
        );
    }

    #[test]
    fn interrupting_keywords() {
        let reg = IntentRegistry::new();
        assert!(is_interrupting("next image", &reg));
        assert!(is_interrupting("scroll down", &reg));
        assert!(!is_interrupting("welcome to our store", &reg));
    }

    #[test]
    fn normalizes_transcripts() {
        assert_eq!(normalize_utterance("  Next Image. "), "next image");
        assert_eq!(normalize_utterance("Stop!"), "stop");
    }
}
