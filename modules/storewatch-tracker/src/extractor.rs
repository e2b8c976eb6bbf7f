//! Status extraction: text fragments in, normalized status out.
//!
//! Pure functions, no I/O. The same fragments always produce the same
//! result, which is what makes the heuristics testable apart from any
//! rendering machinery.

use storewatch_common::{Aggregator, PageFragments, StatusLabel, StatusResult};

use crate::rules::{self, ETA_RE, SOLDOUT_SCAN_LIMIT};

/// Patterns whose presence marks an element as a sold-out item card.
const SOLD_OUT_PATTERNS: &[&str] = &["sold out", "unavailable"];

/// Derive the normalized status for one page fetch.
pub fn extract(fragments: &PageFragments, aggregator: Aggregator) -> StatusResult {
    let label = if fragments.is_empty() {
        // Nothing matched any locator strategy — the page gave us nothing
        // to classify, which is different from "open with no banners".
        StatusLabel::Unknown
    } else {
        infer_label(&fragments.status, aggregator)
    };

    let eta = parse_eta(&fragments.eta);

    let sold_out = match aggregator {
        Aggregator::Swiggy => {
            let count = count_sold_out(&fragments.sold_out);
            (count > 0).then_some(count)
        }
        Aggregator::Zomato => None,
    };

    StatusResult {
        label,
        eta,
        sold_out,
    }
}

/// First matching rule in the aggregator's priority ladder wins; a page with
/// no recognized status substring is Available.
fn infer_label(status_fragments: &[String], aggregator: Aggregator) -> StatusLabel {
    let joined = status_fragments.join(" | ");
    let lowered = joined.to_lowercase();

    for rule in rules::status_rules(aggregator) {
        if let Some(label) = rule(&joined, &lowered) {
            return label;
        }
    }
    StatusLabel::Available
}

/// All ETA-looking matches across the fragments; if the per-fragment scan
/// finds nothing, retry against the joined text (ETA text split across
/// elements). Shortest textual match wins, first-seen on ties.
pub fn parse_eta(eta_fragments: &[String]) -> Option<String> {
    let mut hits: Vec<String> = eta_fragments
        .iter()
        .flat_map(|fragment| {
            ETA_RE
                .find_iter(fragment)
                .map(|m| m.as_str().trim().to_string())
        })
        .collect();

    if hits.is_empty() {
        // Space-joined so a number in one element and "mins" in the next
        // reassemble into something the pattern can see.
        let joined = eta_fragments.join(" ");
        hits = ETA_RE
            .find_iter(&joined)
            .map(|m| m.as_str().trim().to_string())
            .collect();
    }

    hits.sort_by_key(|hit| hit.len());
    hits.into_iter().next()
}

/// Count matched elements, not distinct texts: five sold-out cards with the
/// same label count as five.
fn count_sold_out(sold_out_fragments: &[String]) -> u32 {
    sold_out_fragments
        .iter()
        .take(SOLDOUT_SCAN_LIMIT)
        .filter(|fragment| {
            let lowered = fragment.to_lowercase();
            SOLD_OUT_PATTERNS.iter().any(|p| lowered.contains(p))
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn status_only(items: &[&str]) -> PageFragments {
        PageFragments {
            status: strings(items),
            ..Default::default()
        }
    }

    #[test]
    fn closed_outranks_opens_at() {
        let fragments = status_only(&["Temporarily Closed", "Opens at 9pm"]);
        let result = extract(&fragments, Aggregator::Swiggy);
        assert_eq!(result.label, StatusLabel::Closed);
    }

    #[test]
    fn not_accepting_outranks_opens_at() {
        let fragments = status_only(&["Currently not accepting orders", "Opens at 11am"]);
        let result = extract(&fragments, Aggregator::Zomato);
        assert_eq!(result.label, StatusLabel::NotAccepting);
    }

    #[test]
    fn unrecognized_fragments_default_to_available() {
        let fragments = status_only(&["Best biryani in town", "4.3 stars"]);
        let result = extract(&fragments, Aggregator::Swiggy);
        assert_eq!(result.label, StatusLabel::Available);
        assert_eq!(result.eta, None);
        assert_eq!(result.sold_out, None);
    }

    #[test]
    fn empty_fragments_are_unknown() {
        let result = extract(&PageFragments::default(), Aggregator::Swiggy);
        assert_eq!(result.label, StatusLabel::Unknown);
    }

    #[test]
    fn opens_at_captures_time_text() {
        let fragments = PageFragments {
            status: strings(&["Opens at 9:00 PM"]),
            eta: strings(&["25-30 mins"]),
            sold_out: Vec::new(),
        };
        let result = extract(&fragments, Aggregator::Zomato);
        assert_eq!(result.label, StatusLabel::OpensAt("9:00 PM".to_string()));
        assert_eq!(result.eta.as_deref(), Some("25-30 mins"));
        assert_eq!(result.render(), "Opens at 9:00 PM | 25-30 mins");
    }

    #[test]
    fn case_insensitive_matching() {
        let fragments = status_only(&["CLOSED FOR DELIVERY"]);
        let result = extract(&fragments, Aggregator::Swiggy);
        assert_eq!(result.label, StatusLabel::Closed);
    }

    #[test]
    fn sold_out_counts_elements_not_distinct_texts() {
        let fragments = PageFragments {
            sold_out: strings(&["Sold out", "Sold out", "Unavailable"]),
            ..Default::default()
        };
        let result = extract(&fragments, Aggregator::Swiggy);
        assert_eq!(result.sold_out, Some(3));
        // No status banner matched anything, so the store itself reads as
        // open — only the item cards are sold out.
        assert_eq!(result.render(), "Available | SO:3");
    }

    #[test]
    fn sold_out_not_tracked_for_zomato() {
        let fragments = PageFragments {
            status: strings(&["Open now"]),
            sold_out: strings(&["Sold out"]),
            ..Default::default()
        };
        let result = extract(&fragments, Aggregator::Zomato);
        assert_eq!(result.sold_out, None);
    }

    #[test]
    fn eta_range_forms() {
        assert_eq!(
            parse_eta(&strings(&["25-30 mins"])).as_deref(),
            Some("25-30 mins")
        );
        assert_eq!(
            parse_eta(&strings(&["25 – 30 mins"])).as_deref(),
            Some("25 – 30 mins")
        );
        assert_eq!(
            parse_eta(&strings(&["25 to 30 mins"])).as_deref(),
            Some("25 to 30 mins")
        );
        assert_eq!(parse_eta(&strings(&["20 min"])).as_deref(), Some("20 min"));
    }

    #[test]
    fn eta_shortest_match_wins() {
        // The promo banner's "5 mins" beats the listing's "25-30 mins" on
        // length. Intentional: shortest textual match is the tie-break.
        let eta = parse_eta(&strings(&["Delivery in 25-30 mins", "Deals under 5 mins away"]));
        assert_eq!(eta.as_deref(), Some("5 mins"));
    }

    #[test]
    fn eta_falls_back_to_joined_fragments() {
        // Number and unit split across elements; only the joined scan sees it.
        let eta = parse_eta(&strings(&["35", "mins"]));
        assert_eq!(eta.as_deref(), Some("35 mins"));
    }

    #[test]
    fn eta_absent() {
        assert_eq!(parse_eta(&strings(&["No delivery info"])), None);
        assert_eq!(parse_eta(&[]), None);
    }
}
