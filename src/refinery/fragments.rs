// * Visible-text fragment collection
// * A fragment is one trimmed text node, in document order, with UI affordance text removed.

use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

// * Text under these tags is never rendered as card content
const NON_VISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

// * "(opens in new tab)" / "Opens in a new window" screen-reader affordances
static PATTERN_AFFORDANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(?\s*opens?\s+in\s+(?:a\s+)?new\s+(?:tab|window)\s*\)?")
        .expect("Invalid affordance regex")
});

static PATTERN_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Normalizes one raw text unit into a fragment.
///
/// Strips affordance text, collapses internal whitespace and trims.
/// Returns None when nothing visible remains.
pub fn clean_fragment(raw: &str) -> Option<String> {
    let stripped = PATTERN_AFFORDANCE.replace_all(raw, " ");
    let collapsed = PATTERN_WHITESPACE.replace_all(&stripped, " ");
    let trimmed = collapsed.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collects the visible text fragments under `root`, in document order
pub fn collect_fragments(root: ElementRef<'_>) -> Vec<String> {
    let root_id = root.id();

    root.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;

            // * Walk up to (and including) the root looking for hidden containers
            for ancestor in node.ancestors() {
                if let Some(element) = ancestor.value().as_element() {
                    if NON_VISIBLE_TAGS.contains(&element.name()) {
                        return None;
                    }
                }
                if ancestor.id() == root_id {
                    break;
                }
            }

            clean_fragment(text)
        })
        .collect()
}

/// Joined visible text of `root`, fragments separated by single spaces
pub fn visible_text(root: ElementRef<'_>) -> String {
    collect_fragments(root).join(" ")
}
