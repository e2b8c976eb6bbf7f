//! Pure grid logic for one tab: header discovery, log-column allocation,
//! and turning sheet rows into job slots.

use storewatch_common::{to_float, StoreJob, MISSING_DATA};

use crate::orchestrator::JobSlot;

/// Lower-cased header names that must all appear in one row.
pub const REQUIRED_HEADERS: &[&str] = &[
    "brand",
    "location",
    "aggregator",
    "link",
    "latitude",
    "longitude",
];

/// First sheet row that can hold store data. Rows 1 and 2 belong to the
/// log-column date/time stamps.
const FIRST_DATA_ROW: u32 = 3;

/// Where each required field lives, 1-based columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumns {
    pub header_row: u32,
    pub brand: u32,
    pub location: u32,
    pub aggregator: u32,
    pub link: u32,
    pub latitude: u32,
    pub longitude: u32,
}

/// Find the first row whose cells are a superset of the required header
/// names, case-insensitive, order-independent.
pub fn find_header_row(grid: &[Vec<String>]) -> Option<HeaderColumns> {
    for (i, row) in grid.iter().enumerate() {
        let lowers: Vec<String> = row.iter().map(|c| c.trim().to_lowercase()).collect();
        if !REQUIRED_HEADERS
            .iter()
            .all(|wanted| lowers.iter().any(|cell| cell == wanted))
        {
            continue;
        }

        let position = |name: &str| -> Option<u32> {
            lowers.iter().position(|cell| cell == name).map(|p| p as u32 + 1)
        };

        return Some(HeaderColumns {
            header_row: i as u32 + 1,
            brand: position("brand")?,
            location: position("location")?,
            aggregator: position("aggregator")?,
            link: position("link")?,
            latitude: position("latitude")?,
            longitude: position("longitude")?,
        });
    }
    None
}

/// First column at or right of `start_col` whose row-1 and row-2 cells are
/// both empty. Stamped columns are never reused.
pub fn first_free_log_column(grid: &[Vec<String>], start_col: u32) -> u32 {
    let cell = |row: usize, col: u32| -> &str {
        grid.get(row)
            .and_then(|r| r.get((col - 1) as usize))
            .map(|s| s.trim())
            .unwrap_or("")
    };

    let mut col = start_col;
    loop {
        if cell(0, col).is_empty() && cell(1, col).is_empty() {
            return col;
        }
        col += 1;
    }
}

/// One slot per data row: a job when aggregator and link are present, a
/// pre-resolved missing-data outcome otherwise.
pub fn build_slots(grid: &[Vec<String>], columns: &HeaderColumns) -> Vec<(u32, JobSlot)> {
    let first_row = FIRST_DATA_ROW.max(columns.header_row + 1);
    let mut slots = Vec::new();

    for row in first_row..=grid.len() as u32 {
        let cells = &grid[(row - 1) as usize];
        let value = |col: u32| -> &str {
            cells
                .get((col - 1) as usize)
                .map(|s| s.trim())
                .unwrap_or("")
        };

        let aggregator = value(columns.aggregator);
        let link = value(columns.link);

        if aggregator.is_empty() || link.is_empty() {
            slots.push((row, JobSlot::Resolved(MISSING_DATA.to_string())));
        } else {
            slots.push((
                row,
                JobSlot::Ready(StoreJob {
                    row,
                    aggregator: aggregator.to_string(),
                    url: link.to_string(),
                    lat: to_float(value(columns.latitude)),
                    lng: to_float(value(columns.longitude)),
                }),
            ));
        }
    }

    slots
}
