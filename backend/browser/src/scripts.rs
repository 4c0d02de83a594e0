//! Page-side JavaScript for each [`PageScript`].
//!
//! Every script is a function taking at most one argument; the argument is
//! JSON-encoded into the call, never spliced in as source text.

use pagesight_core::PageScript;
use serde_json::Value;

const SCROLL_TO_TOP: &str = "() => { window.scrollTo({ top: 0, behavior: 'smooth' }); return true; }";

const SCROLL_TO_BOTTOM: &str =
    "() => { window.scrollTo({ top: document.body.scrollHeight, behavior: 'smooth' }); return true; }";

/// Case-insensitive find; highlights and scrolls to the first match.
const FIND_TEXT: &str = r#"(query) => {
  document.querySelectorAll('mark[data-pagesight]').forEach((m) => m.replaceWith(document.createTextNode(m.textContent)));
  const needle = String(query).toLowerCase();
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  for (let node = walker.nextNode(); node; node = walker.nextNode()) {
    const at = node.nodeValue.toLowerCase().indexOf(needle);
    if (at < 0 || !node.parentElement || node.parentElement.closest('script, style')) { continue; }
    const range = document.createRange();
    range.setStart(node, at);
    range.setEnd(node, at + needle.length);
    const mark = document.createElement('mark');
    mark.setAttribute('data-pagesight', '');
    range.surroundContents(mark);
    mark.scrollIntoView({ behavior: 'smooth', block: 'center' });
    return true;
  }
  return false;
}"#;

const HIGHLIGHT_IMAGE: &str = r#"(src) => {
  document.querySelectorAll('img[data-pagesight]').forEach((i) => { i.style.outline = ''; i.removeAttribute('data-pagesight'); });
  const img = Array.from(document.images).find((i) => i.currentSrc === src || i.src === src);
  if (!img) { return false; }
  img.setAttribute('data-pagesight', '');
  img.style.outline = '4px solid #f5a623';
  img.scrollIntoView({ behavior: 'smooth', block: 'center' });
  return true;
}"#;

fn function_for(script: &PageScript) -> &'static str {
    match script {
        PageScript::ScrollToTop => SCROLL_TO_TOP,
        PageScript::ScrollToBottom => SCROLL_TO_BOTTOM,
        PageScript::FindText { .. } => FIND_TEXT,
        PageScript::HighlightImage { .. } => HIGHLIGHT_IMAGE,
    }
}

/// An expression that invokes the script's function with its argument.
pub fn render_script(script: &PageScript) -> String {
    let argument = script.argument().unwrap_or(Value::Null);
    let encoded = if argument.is_null() { String::new() } else { argument.to_string() };
    format!("({})({})", function_for(script), encoded)
}
