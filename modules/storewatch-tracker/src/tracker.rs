//! Sequential per-tab cycle: prepare the tab, orchestrate its checks,
//! persist the outcomes. One tab at a time bounds rendering-service usage
//! to a single worker pool, and one tab's failure never stops the rest.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use storewatch_common::{now_date_str, now_time_str, CellWrite, Config, StoreWatchError};

use crate::orchestrator::TabOrchestrator;
use crate::tabs::{build_slots, find_header_row, first_free_log_column};
use crate::traits::TabularStore;

pub struct Tracker {
    store: Arc<dyn TabularStore>,
    orchestrator: TabOrchestrator,
    input_tabs: Vec<String>,
    utc_offset_minutes: i32,
}

impl Tracker {
    pub fn new(store: Arc<dyn TabularStore>, orchestrator: TabOrchestrator, config: &Config) -> Self {
        Self {
            store,
            orchestrator,
            input_tabs: config.input_tabs.clone(),
            utc_offset_minutes: config.utc_offset_minutes,
        }
    }

    /// The configured tab list, or every tab in the spreadsheet when none
    /// are configured.
    pub async fn tabs_to_process(&self) -> Result<Vec<String>> {
        if self.input_tabs.is_empty() {
            self.store.list_tabs().await
        } else {
            Ok(self.input_tabs.clone())
        }
    }

    /// Process tabs strictly in order. A failing tab is logged and skipped;
    /// the run continues.
    pub async fn run_all(&self, tabs: &[String]) {
        for tab in tabs {
            if let Err(e) = self.process_tab(tab).await {
                warn!(tab = tab.as_str(), error = %e, "Tab processing failed");
            }
        }
    }

    /// One tab's full cycle: Prepare → Orchestrate → Persist.
    pub async fn process_tab(&self, tab: &str) -> Result<()> {
        // Prepare: read the grid, locate the header, claim a log column.
        let grid = self.store.read_all(tab).await?;
        if grid.is_empty() {
            info!(tab, "Empty tab, skipping");
            return Ok(());
        }

        let columns = find_header_row(&grid)
            .ok_or_else(|| StoreWatchError::HeaderNotFound(tab.to_string()))?;
        let log_col = first_free_log_column(&grid, columns.longitude + 1);

        // Stamp the column before any outcomes land in it: a stamped column
        // is never re-allocated by a later cycle.
        self.store
            .write_cell(tab, 1, log_col, &now_date_str(self.utc_offset_minutes))
            .await?;
        self.store
            .write_cell(tab, 2, log_col, &now_time_str(self.utc_offset_minutes))
            .await?;

        // Orchestrate.
        let slots = build_slots(&grid, &columns);
        let results = self.orchestrator.run_tab(slots).await;

        // Persist: one batched write for the whole tab, rows in order.
        let mut rows: Vec<(u32, String)> = results.into_iter().collect();
        rows.sort_by_key(|(row, _)| *row);
        let writes: Vec<CellWrite> = rows
            .into_iter()
            .map(|(row, value)| CellWrite {
                row,
                col: log_col,
                value,
            })
            .collect();

        let logged = writes.len();
        if !writes.is_empty() {
            self.store.batch_write(tab, &writes).await?;
        }

        info!(tab, rows = logged, column = log_col, "Logged outcomes");
        Ok(())
    }
}
