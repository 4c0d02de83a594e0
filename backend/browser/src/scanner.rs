//! The page scanner program and the expression that queries it.
//!
//! Injecting [`SCANNER_JS`] installs `window.__pagesightScan`, which returns a
//! snapshot object in the camelCase shape `PageSnapshot` deserializes from.
//! [`REQUEST_SNAPSHOT_JS`] evaluates to `null` when the scanner is missing,
//! which the transport reports as "no scanner answered".

/// Installs the scanner. Idempotent.
pub const SCANNER_JS: &str = r#"(() => {
  if (typeof window.__pagesightScan === 'function') { return true; }
  const clean = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const isPdf = (href) => /\.pdf($|[?#])/i.test(href || '');
  window.__pagesightScan = () => {
    const headings = Array.from(document.querySelectorAll('h1, h2, h3, h4, h5, h6'))
      .map((h) => ({ level: h.tagName, text: clean(h.innerText) }))
      .filter((h) => h.text.length > 0);

    const mainText = Array.from(document.querySelectorAll('main p, article p, p'))
      .map((p) => clean(p.innerText))
      .filter((t, i, all) => t.length > 0 && all.indexOf(t) === i)
      .slice(0, 10);

    const images = Array.from(document.querySelectorAll('img'))
      .map((img, index) => ({
        id: `img-${index}`,
        src: img.currentSrc || img.src,
        alt: clean(img.getAttribute('alt')),
        isAccessible: clean(img.getAttribute('alt')).length > 0,
        isOCRCandidate: img.width > 50 && img.height > 50 && (img.currentSrc || img.src).startsWith('http'),
        dimensions: { width: img.width, height: img.height },
      }))
      .filter((img) => img.src.startsWith('http'));

    const anchors = Array.from(document.querySelectorAll('a[href]'));
    const pdfs = anchors
      .filter((a) => isPdf(a.href))
      .map((a, index) => ({ id: `pdf-${index}`, text: clean(a.innerText) || 'Unnamed PDF Document', href: a.href }));

    const links = anchors
      .filter((a) => !isPdf(a.href))
      .map((a) => ({ text: clean(a.innerText), href: a.href }))
      .filter((l) => l.text.length > 0 && l.href.startsWith('http'))
      .slice(0, 15);

    return {
      title: document.title,
      url: window.location.href,
      timestamp: Date.now(),
      headings,
      mainText,
      images,
      links,
      pdfs,
    };
  };
  return true;
})()"#;

/// Ask the scanner for a snapshot; `null` when it is not installed.
pub const REQUEST_SNAPSHOT_JS: &str =
    "typeof window.__pagesightScan === 'function' ? window.__pagesightScan() : null";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_installs_the_function_the_request_calls() {
        assert!(SCANNER_JS.contains("window.__pagesightScan = "));
        assert!(REQUEST_SNAPSHOT_JS.contains("window.__pagesightScan()"));
    }

    #[test]
    fn scanner_keeps_link_limit_and_field_names() {
        for field in ["mainText", "isAccessible", "isOCRCandidate", "pdfs", ".slice(0, 15)"] {
            assert!(SCANNER_JS.contains(field), "missing {field}");
        }
    }
}
