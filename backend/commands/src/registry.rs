/// The intent table: an explicit, ordered list of rules. Classification walks
/// it top to bottom and the first rule with a matching phrase wins, so the
/// order of `builtin_rules` is the precedence.
use crate::types::IntentCategory;

/// One row of the intent table.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub category: IntentCategory,
    /// Whole-word phrases; any one of them selects this rule.
    pub phrases: Vec<String>,
}

impl IntentRule {
    fn new(category: IntentCategory, phrases: &[&str]) -> Self {
        Self {
            category,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Built-in rules, highest precedence first.
pub fn builtin_rules() -> Vec<IntentRule> {
    use IntentCategory::*;
    vec![
        IntentRule::new(Stop, &["stop", "shut up", "shutup", "quiet", "pause", "silence"]),
        IntentRule::new(Faster, &["faster", "speed up", "fast"]),
        IntentRule::new(Slower, &["slower", "slow down", "slow"]),
        IntentRule::new(
            Summarize,
            &["summarize", "summarise", "summary", "gist", "main points", "main idea", "what is this page"],
        ),
        IntentRule::new(
            NavTop,
            &["scroll to top", "go to top", "start of page", "top", "beginning", "scroll up", "up"],
        ),
        IntentRule::new(
            NavBottom,
            &["scroll to bottom", "go to bottom", "end of page", "bottom", "end", "scroll down", "down"],
        ),
        IntentRule::new(
            NextImage,
            &["next image", "find image", "go to image", "image", "images", "picture", "pictures", "describe"],
        ),
        IntentRule::new(
            ReadHeadings,
            &["read headings", "headings", "heading", "outline", "header", "headers", "title"],
        ),
        IntentRule::new(
            ReadContent,
            &["read content", "read text", "read body", "what does it say", "read page", "read", "body", "text"],
        ),
        IntentRule::new(Search, SEARCH_PHRASES),
    ]
}

/// Leading command words stripped from a search utterance.
pub const SEARCH_PHRASES: &[&str] = &["where is", "show me", "look for", "search", "find"];

/// Words that may barge in while the engine is speaking.
pub const INTERRUPT_KEYWORDS: &[&str] = &[
    "top", "bottom", "scroll", "up", "down", "next", "image", "images", "picture", "read",
    "heading", "headings", "summary", "summarize", "summarise", "search", "find", "where", "show",
    "faster", "slower", "speed",
];

/// Ordered intent table plus the barge-in whitelist.
#[derive(Debug, Clone)]
pub struct IntentRegistry {
    rules: Vec<IntentRule>,
    interrupt_keywords: Vec<String>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self {
            rules: builtin_rules(),
            interrupt_keywords: INTERRUPT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    pub fn interrupt_keywords(&self) -> &[String] {
        &self.interrupt_keywords
    }

    pub fn rule(&self, category: IntentCategory) -> Option<&IntentRule> {
        self.rules.iter().find(|r| r.category == category)
    }

    /// Add extra phrases to an existing rule without changing its precedence.
    pub fn extend_phrases(&mut self, category: IntentCategory, phrases: &[&str]) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.category == category) {
            rule.phrases.extend(phrases.iter().map(|p| p.to_lowercase()));
        }
    }
}

impl Default for IntentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order_is_fixed() {
        let order: Vec<_> = IntentRegistry::new().rules().iter().map(|r| r.category).collect();
        use IntentCategory::*;
        assert_eq!(
            order,
            vec![Stop, Faster, Slower, Summarize, NavTop, NavBottom, NextImage, ReadHeadings, ReadContent, Search]
        );
    }

    #[test]
    fn extend_keeps_position() {
        let mut reg = IntentRegistry::new();
        reg.extend_phrases(IntentCategory::Summarize, &["TLDR"]);
        let rule = reg.rule(IntentCategory::Summarize).unwrap();
        assert!(rule.phrases.contains(&"tldr".to_string()));
        assert_eq!(reg.rules()[3].category, IntentCategory::Summarize);
    }
}
