use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));

/// Subtrees that never contribute readable page content.
const SKIPPED_TAGS: [&str; 10] = [
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer", "aside",
];

/// Extract the visible text of a page: text nodes in document order, with
/// non-content subtrees skipped and whitespace collapsed.
///
/// Lenient on purpose: malformed or empty input yields an empty string,
/// never an error.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut chunks: Vec<&str> = Vec::new();
    if let Some(body) = document.select(&BODY).next() {
        collect_text(body, &mut chunks);
    }
    let text = normalize_whitespace(&chunks.join(" "));
    debug!(chars = text.len(), "extracted page text");
    text
}

fn collect_text<'a>(element: ElementRef<'a>, out: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push(&**text);
        } else if let Some(el) = ElementRef::wrap(child) {
            if !SKIPPED_TAGS.contains(&el.value().name()) {
                collect_text(el, out);
            }
        }
    }
}

/// Trimmed `<title>` text, when the page has one.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|title| !title.is_empty())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`; the whole text when it is already
/// within the bound. Pure and deterministic.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
