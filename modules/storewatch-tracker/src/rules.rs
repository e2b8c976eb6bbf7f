//! Aggregator-specific heuristics: status rule ladders and page locator sets.
//!
//! Status rules are an ordered priority list, not a vote — the first rule
//! that matches the joined page text wins. Locator sets carry two to three
//! independent fallback strategies per concern; their union is what the
//! extractor sees.

use std::sync::LazyLock;

use regex::Regex;

use browserless_client::Locator;
use storewatch_common::{Aggregator, StatusLabel};

/// Element cap per locator for status/ETA scans.
pub const MAX_ELEMENTS: usize = 60;

/// Element cap per locator for the sold-out scan. Menu pages can carry
/// hundreds of item cards; this bounds the walk.
pub const SOLDOUT_SCAN_LIMIT: usize = 300;

/// `20 mins`, `25-30 mins`, `25 – 30 mins`, `25 to 30 mins`.
pub static ETA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\s*(?:–|-|to)?\s*(\d+)?\s*mins?\b").expect("valid regex")
});

/// `Opens at 9:00 PM` — capture is the time text, case preserved.
pub static OPENS_AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)opens?\s+at\s+([0-9:\sapm\.]+)").expect("valid regex"));

// ---------------------------------------------------------------------------
// Status rules
// ---------------------------------------------------------------------------

/// One status rule over the joined page text. `text` keeps the page's
/// casing (OpensAt captures from it); `lowered` is for substring tests.
pub type StatusRule = fn(text: &str, lowered: &str) -> Option<StatusLabel>;

fn closed(_text: &str, lowered: &str) -> Option<StatusLabel> {
    (lowered.contains("temporarily closed") || lowered.contains("closed"))
        .then_some(StatusLabel::Closed)
}

fn not_accepting(_text: &str, lowered: &str) -> Option<StatusLabel> {
    lowered
        .contains("not accepting")
        .then_some(StatusLabel::NotAccepting)
}

fn opens_at(text: &str, _lowered: &str) -> Option<StatusLabel> {
    OPENS_AT_RE
        .captures(text)
        .map(|caps| StatusLabel::OpensAt(caps[1].trim().to_string()))
}

/// Shared priority ladder: Closed > NotAccepting > OpensAt. Kept
/// per-aggregator so one platform can diverge without touching the extractor.
const COMMON_STATUS_RULES: &[StatusRule] = &[closed, not_accepting, opens_at];

pub fn status_rules(aggregator: Aggregator) -> &'static [StatusRule] {
    match aggregator {
        Aggregator::Swiggy => COMMON_STATUS_RULES,
        Aggregator::Zomato => COMMON_STATUS_RULES,
    }
}

// ---------------------------------------------------------------------------
// Locator sets
// ---------------------------------------------------------------------------

/// Where to look on a rendered page, per concern. An empty `sold_out` set
/// means the aggregator variant doesn't track sold-out counts.
pub struct LocatorSet {
    pub status: &'static [Locator],
    pub eta: &'static [Locator],
    pub sold_out: &'static [Locator],
}

static SWIGGY: LocatorSet = LocatorSet {
    status: &[
        Locator::TextContains("closed"),
        Locator::TextContains("not accepting"),
        Locator::TextContains("opens at"),
        Locator::TextContains("Currently unavailable"),
        Locator::TextContains("Unavailable in your area"),
        Locator::Css("[class*='status'], [class*='badge'], [class*='banner']"),
    ],
    eta: &[
        Locator::TextContains("mins"),
        Locator::Css("[class*='minute'], [class*='mins'], [class*='eta'], [class*='delivery']"),
    ],
    sold_out: &[
        Locator::TextContains("sold out"),
        Locator::TextContains("unavailable"),
    ],
};

static ZOMATO: LocatorSet = LocatorSet {
    status: &[
        Locator::TextContains("closed"),
        Locator::TextContains("opens at"),
        Locator::TextContains("not accepting"),
        Locator::TextContains("Temporarily closed"),
        Locator::TextContains("Currently not accepting orders"),
    ],
    eta: &[
        Locator::TextContains("mins"),
        Locator::Css("[class*='minute'], [class*='mins'], [class*='time'], [class*='eta']"),
    ],
    sold_out: &[],
};

pub fn locators(aggregator: Aggregator) -> &'static LocatorSet {
    match aggregator {
        Aggregator::Swiggy => &SWIGGY,
        Aggregator::Zomato => &ZOMATO,
    }
}
