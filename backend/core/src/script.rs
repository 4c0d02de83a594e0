//! Page-side actions the controller can ask the remote execution bridge to run.
//!
//! The set is closed on purpose: the bridge owns the page-side function for
//! each variant and passes at most one argument across the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageScript {
    ScrollToTop,
    ScrollToBottom,
    /// Exact in-page text search; the first match is highlighted and scrolled into view.
    FindText { query: String },
    /// Highlight and scroll to the image with this `src`.
    HighlightImage { src: String },
}

impl PageScript {
    /// Stable name, used for logging and for looking up the page-side function.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ScrollToTop => "scroll_to_top",
            Self::ScrollToBottom => "scroll_to_bottom",
            Self::FindText { .. } => "find_text",
            Self::HighlightImage { .. } => "highlight_image",
        }
    }

    /// The single optional argument handed to the page-side function.
    pub fn argument(&self) -> Option<Value> {
        match self {
            Self::ScrollToTop | Self::ScrollToBottom => None,
            Self::FindText { query } => Some(Value::String(query.clone())),
            Self::HighlightImage { src } => Some(Value::String(src.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_targeted_scripts_carry_an_argument() {
        assert_eq!(PageScript::ScrollToTop.argument(), None);
        assert_eq!(
            PageScript::FindText { query: "shipping policy".into() }.argument(),
            Some(Value::String("shipping policy".into()))
        );
    }
}
