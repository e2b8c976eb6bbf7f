use chrono::{FixedOffset, Utc};

/// Outcome recorded for rows whose sheet data is incomplete.
pub const MISSING_DATA: &str = "Missing link/aggregator";

// --- Aggregator ---

/// Delivery platform a storefront is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    Swiggy,
    Zomato,
}

impl Aggregator {
    /// Parse a sheet cell. Anything starting with "swiggy" (case-insensitive)
    /// is Swiggy; any other non-empty value is treated as Zomato.
    pub fn from_cell(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() {
            return None;
        }
        if cell.to_lowercase().starts_with("swiggy") {
            Some(Aggregator::Swiggy)
        } else {
            Some(Aggregator::Zomato)
        }
    }
}

// --- Job ---

/// One store-check unit, built from a single sheet row.
#[derive(Debug, Clone)]
pub struct StoreJob {
    /// 1-based row in the tab the outcome writes back to.
    pub row: u32,
    /// Raw aggregator cell value. Validated by the checker.
    pub aggregator: String,
    pub url: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Tolerant float parse for sheet cells. Empty or unparseable → None.
pub fn to_float(cell: &str) -> Option<f64> {
    let s = cell.trim();
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

// --- Fragments ---

/// Text fragments gathered from one rendered page, scoped per concern the
/// way the locator sets gather them. Status and ETA fragments arrive
/// de-duplicated; sold-out fragments arrive one-per-matched-element so the
/// count reflects elements, not distinct texts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFragments {
    pub status: Vec<String>,
    pub eta: Vec<String>,
    pub sold_out: Vec<String>,
}

impl PageFragments {
    pub fn is_empty(&self) -> bool {
        self.status.is_empty() && self.eta.is_empty() && self.sold_out.is_empty()
    }
}

// --- Status ---

/// Normalized storefront status, highest-priority rule first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLabel {
    Available,
    Closed,
    NotAccepting,
    OpensAt(String),
    Unknown,
}

impl std::fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLabel::Available => write!(f, "Available"),
            StatusLabel::Closed => write!(f, "Closed"),
            StatusLabel::NotAccepting => write!(f, "Not accepting orders"),
            StatusLabel::OpensAt(time) => write!(f, "Opens at {time}"),
            StatusLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of extracting status signals from one page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResult {
    pub label: StatusLabel,
    pub eta: Option<String>,
    pub sold_out: Option<u32>,
}

impl StatusResult {
    /// Render to the compact form stored in the log column:
    /// label, then `" | " + eta`, then `" | SO:" + count` when count > 0.
    pub fn render(&self) -> String {
        let mut compact = self.label.to_string();
        if let Some(ref eta) = self.eta {
            compact.push_str(" | ");
            compact.push_str(eta);
        }
        if let Some(count) = self.sold_out {
            if count > 0 {
                compact.push_str(&format!(" | SO:{count}"));
            }
        }
        compact
    }
}

// --- Tabular store writes ---

/// One cell write, 1-based row/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellWrite {
    pub row: u32,
    pub col: u32,
    pub value: String,
}

// --- Cycle timestamps ---

/// Fixed offset for cycle timestamps. An out-of-range value falls back to
/// UTC rather than failing the cycle.
pub fn fixed_offset(offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"))
}

/// Current date in the configured offset, `YYYY-MM-DD`.
pub fn now_date_str(offset_minutes: i32) -> String {
    Utc::now()
        .with_timezone(&fixed_offset(offset_minutes))
        .format("%Y-%m-%d")
        .to_string()
}

/// Current time in the configured offset, `HH:MM:SS`.
pub fn now_time_str(offset_minutes: i32) -> String {
    Utc::now()
        .with_timezone(&fixed_offset(offset_minutes))
        .format("%H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregator_from_cell() {
        assert_eq!(Aggregator::from_cell("Swiggy"), Some(Aggregator::Swiggy));
        assert_eq!(
            Aggregator::from_cell("  swiggy instamart "),
            Some(Aggregator::Swiggy)
        );
        assert_eq!(Aggregator::from_cell("Zomato"), Some(Aggregator::Zomato));
        assert_eq!(Aggregator::from_cell("other"), Some(Aggregator::Zomato));
        assert_eq!(Aggregator::from_cell(""), None);
        assert_eq!(Aggregator::from_cell("   "), None);
    }

    #[test]
    fn to_float_tolerates_junk() {
        assert_eq!(to_float(" 12.97 "), Some(12.97));
        assert_eq!(to_float("-77.5"), Some(-77.5));
        assert_eq!(to_float(""), None);
        assert_eq!(to_float("n/a"), None);
    }

    #[test]
    fn render_label_only() {
        let result = StatusResult {
            label: StatusLabel::Available,
            eta: None,
            sold_out: None,
        };
        assert_eq!(result.render(), "Available");
    }

    #[test]
    fn render_with_eta_and_sold_out() {
        let result = StatusResult {
            label: StatusLabel::OpensAt("9:00 pm".to_string()),
            eta: Some("25-30 mins".to_string()),
            sold_out: Some(3),
        };
        assert_eq!(result.render(), "Opens at 9:00 pm | 25-30 mins | SO:3");
    }

    #[test]
    fn render_omits_zero_sold_out() {
        let result = StatusResult {
            label: StatusLabel::Closed,
            eta: None,
            sold_out: Some(0),
        };
        assert_eq!(result.render(), "Closed");
    }
}
