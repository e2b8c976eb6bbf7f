// Test mocks for the tracker pipeline.
//
// Two mocks matching the two trait boundaries:
// - MockFetcher (PageFetcher/PageSession) — URL→fragments map with scripted
//   failures and open/close accounting
// - MemoryStore (TabularStore) — stateful in-memory grid
//
// Plus helpers for building grids and a zero-delay Config so checker and
// orchestrator tests run without real waits.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use browserless_client::Locator;
use storewatch_common::{Aggregator, CellWrite, Config, PageFragments};

use crate::rules;
use crate::traits::{FetchError, PageFetcher, PageSession, TabularStore};

/// Config with zero waits and test placeholders for the required settings.
pub fn test_config() -> Config {
    Config {
        sheet_id: "test-sheet".to_string(),
        sheets_token: "test-token".to_string(),
        input_tabs: Vec::new(),
        browserless_url: "http://localhost:3000".to_string(),
        browserless_token: None,
        utc_offset_minutes: 330,
        pageload_timeout: Duration::from_millis(50),
        after_load_wait: Duration::ZERO,
        readiness_timeout: Duration::ZERO,
        between_stores: Duration::ZERO,
        max_workers: 5,
        interval_minutes: 15,
    }
}

/// Build an owned grid from string literals.
pub fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

struct FetcherState {
    pages: HashMap<String, PageFragments>,
    failing_urls: HashSet<String>,
    goto_failures_remaining: u32,
    open_failures_remaining: u32,
    never_ready: bool,
    opens: u32,
    closes: u32,
}

/// URL-keyed page fetcher. Builder pattern: `.on_url()`, `.failing_gotos()`,
/// `.failing_url()`, `.failing_opens()`, `.never_ready()`.
pub struct MockFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FetcherState {
                pages: HashMap::new(),
                failing_urls: HashSet::new(),
                goto_failures_remaining: 0,
                open_failures_remaining: 0,
                never_ready: false,
                opens: 0,
                closes: 0,
            })),
        }
    }

    /// Serve these fragments for navigations to `url`.
    pub fn on_url(self, url: &str, fragments: PageFragments) -> Self {
        self.state.lock().unwrap().pages.insert(url.to_string(), fragments);
        self
    }

    /// Fail the next `n` goto calls, regardless of URL.
    pub fn failing_gotos(self, n: u32) -> Self {
        self.state.lock().unwrap().goto_failures_remaining = n;
        self
    }

    /// Fail every goto to this URL.
    pub fn failing_url(self, url: &str) -> Self {
        self.state.lock().unwrap().failing_urls.insert(url.to_string());
        self
    }

    /// Fail the next `n` session opens.
    pub fn failing_opens(self, n: u32) -> Self {
        self.state.lock().unwrap().open_failures_remaining = n;
        self
    }

    /// Make every readiness wait fail.
    pub fn never_ready(self) -> Self {
        self.state.lock().unwrap().never_ready = true;
        self
    }

    /// Sessions opened so far.
    pub fn opens(&self) -> u32 {
        self.state.lock().unwrap().opens
    }

    /// Sessions closed so far. Equal to `opens()` whenever the checker's
    /// cleanup guarantee holds.
    pub fn closes(&self) -> u32 {
        self.state.lock().unwrap().closes
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn open(&self) -> std::result::Result<Box<dyn PageSession>, FetchError> {
        let mut state = self.state.lock().unwrap();
        if state.open_failures_remaining > 0 {
            state.open_failures_remaining -= 1;
            return Err(FetchError::SessionFailed("scripted open failure".to_string()));
        }
        state.opens += 1;
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            url: None,
            geolocation: None,
        }))
    }
}

struct MockSession {
    state: Arc<Mutex<FetcherState>>,
    url: Option<String>,
    #[allow(dead_code)] // recorded for parity with the real session
    geolocation: Option<(f64, f64)>,
}

impl MockSession {
    /// Map a locator set back to the concern it collects, via the rule
    /// tables the checker actually passes.
    fn fragments_for(&self, locators: &[Locator]) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let Some(fragments) = self.url.as_ref().and_then(|u| state.pages.get(u)) else {
            return Vec::new();
        };
        for aggregator in [Aggregator::Swiggy, Aggregator::Zomato] {
            let set = rules::locators(aggregator);
            if locators == set.status {
                return fragments.status.clone();
            }
            if locators == set.eta {
                return fragments.eta.clone();
            }
            if !set.sold_out.is_empty() && locators == set.sold_out {
                return fragments.sold_out.clone();
            }
        }
        Vec::new()
    }
}

#[async_trait]
impl PageSession for MockSession {
    fn grant_geolocation(&mut self, lat: f64, lng: f64) {
        self.geolocation = Some((lat, lng));
    }

    async fn goto(&mut self, url: &str, _timeout: Duration)
        -> std::result::Result<(), FetchError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_urls.contains(url) {
            return Err(FetchError::LoadError("scripted URL failure".to_string()));
        }
        if state.goto_failures_remaining > 0 {
            state.goto_failures_remaining -= 1;
            return Err(FetchError::LoadError("scripted failure".to_string()));
        }
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn wait_ready(&mut self, _timeout: Duration) -> std::result::Result<(), FetchError> {
        if self.state.lock().unwrap().never_ready {
            Err(FetchError::ReadinessTimeout)
        } else {
            Ok(())
        }
    }

    async fn find_text(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        let mut texts = self.fragments_for(locators);
        texts.truncate(max_elements);
        texts
    }

    async fn find_text_raw(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        let mut texts = self.fragments_for(locators);
        texts.truncate(max_elements);
        texts
    }

    async fn close(&mut self) {
        self.state.lock().unwrap().closes += 1;
        self.url = None;
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory tabular store. Grids grow on write like a real sheet.
pub struct MemoryStore {
    tabs: Mutex<BTreeMap<String, Vec<Vec<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tabs: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_tab(self, name: &str, grid: Vec<Vec<String>>) -> Self {
        self.tabs.lock().unwrap().insert(name.to_string(), grid);
        self
    }

    /// Read one cell for assertions. Absent cells read as empty.
    pub fn cell(&self, tab: &str, row: u32, col: u32) -> String {
        self.tabs
            .lock()
            .unwrap()
            .get(tab)
            .and_then(|g| g.get((row - 1) as usize))
            .and_then(|r| r.get((col - 1) as usize))
            .cloned()
            .unwrap_or_default()
    }

    fn set_cell(grid: &mut Vec<Vec<String>>, row: u32, col: u32, value: &str) {
        let row = (row - 1) as usize;
        let col = (col - 1) as usize;
        if grid.len() <= row {
            grid.resize(row + 1, Vec::new());
        }
        if grid[row].len() <= col {
            grid[row].resize(col + 1, String::new());
        }
        grid[row][col] = value.to_string();
    }
}

#[async_trait]
impl TabularStore for MemoryStore {
    async fn list_tabs(&self) -> Result<Vec<String>> {
        Ok(self.tabs.lock().unwrap().keys().cloned().collect())
    }

    async fn read_all(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        match self.tabs.lock().unwrap().get(tab) {
            Some(grid) => Ok(grid.clone()),
            None => bail!("no such tab: {tab}"),
        }
    }

    async fn write_cell(&self, tab: &str, row: u32, col: u32, value: &str) -> Result<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let Some(grid) = tabs.get_mut(tab) else {
            bail!("no such tab: {tab}");
        };
        Self::set_cell(grid, row, col, value);
        Ok(())
    }

    async fn batch_write(&self, tab: &str, writes: &[CellWrite]) -> Result<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let Some(grid) = tabs.get_mut(tab) else {
            bail!("no such tab: {tab}");
        };
        for write in writes {
            Self::set_cell(grid, write.row, write.col, &write.value);
        }
        Ok(())
    }
}
