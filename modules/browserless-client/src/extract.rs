//! Element-text extraction over a rendered document.
//!
//! Locators play the role selectors play in a live browser: CSS for
//! class/attribute matching, `TextContains` for the "any element whose
//! visible text contains this phrase" style of lookup. `TextContains`
//! matches innermost elements only, so one on-page occurrence yields one
//! fragment rather than the whole ancestor chain.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

/// How to find elements in a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// A CSS selector, e.g. `[class*='status']`.
    Css(&'static str),
    /// Case-insensitive substring match against an element's visible text.
    TextContains(&'static str),
}

/// Collect visible text for every element matched by any locator, in locator
/// order, capped at `max_elements` per locator. `dedup` drops repeated texts
/// while keeping first-seen order.
pub fn collect_text(html: &str, locators: &[Locator], max_elements: usize, dedup: bool) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    for locator in locators {
        let texts: Vec<String> = match locator {
            Locator::Css(raw) => {
                let Ok(selector) = Selector::parse(raw) else {
                    // A bad selector disables one fallback strategy, not the scan.
                    continue;
                };
                document
                    .select(&selector)
                    .take(max_elements)
                    .map(|el| element_text(&el))
                    .collect()
            }
            Locator::TextContains(needle) => text_contains(&document, needle, max_elements),
        };

        for text in texts {
            if text.is_empty() {
                continue;
            }
            if dedup {
                if seen.insert(text.clone()) {
                    out.push(text);
                }
            } else {
                out.push(text);
            }
        }
    }

    out
}

/// Innermost elements whose visible text contains `needle`, case-insensitive.
fn text_contains(document: &Html, needle: &str, max_elements: usize) -> Vec<String> {
    let needle = needle.to_lowercase();
    let Ok(all) = Selector::parse("*") else {
        return Vec::new();
    };

    document
        .select(&all)
        .filter(|el| {
            let own = element_text(el).to_lowercase();
            if !own.contains(&needle) {
                return false;
            }
            // Skip if a child element also contains it — the child (or its
            // own innermost descendant) is the real match.
            !el.children()
                .filter_map(ElementRef::wrap)
                .any(|child| element_text(&child).to_lowercase().contains(&needle))
        })
        .take(max_elements)
        .map(|el| element_text(&el))
        .collect()
}

/// Descendant text with whitespace collapsed, the way a browser renders it.
fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}
