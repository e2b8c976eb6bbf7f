// Trait abstractions for the tracker's two external collaborators.
//
// PageFetcher/PageSession — the rendered-page capability. The checker owns
//   one session per attempt; nothing else touches the rendering service.
// TabularStore — row/column-addressed storage for tab grids and outcomes.
//
// These enable deterministic testing with MockFetcher and MemoryStore:
// no network, no real spreadsheet. `cargo test` in seconds.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use browserless_client::{BrowserlessClient, BrowserlessError, Locator, RenderSession};
use gsheets_client::SheetsClient;
use storewatch_common::CellWrite;

// ---------------------------------------------------------------------------
// Fetch port
// ---------------------------------------------------------------------------

/// Typed failure for one fetch attempt. The kind tag ends up in row outcomes
/// as `"Error: <kind>"` when the retry budget is exhausted.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("session open failed: {0}")]
    SessionFailed(String),

    #[error("page load timed out")]
    LoadTimeout,

    #[error("page load failed: {0}")]
    LoadError(String),

    #[error("page never became ready")]
    ReadinessTimeout,
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::SessionFailed(_) => "SessionFailed",
            FetchError::LoadTimeout => "LoadTimeout",
            FetchError::LoadError(_) => "LoadError",
            FetchError::ReadinessTimeout => "ReadinessTimeout",
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Open a fresh rendering session. Each store check owns its session
    /// exclusively; sessions are never shared across concurrent checks.
    async fn open(&self) -> std::result::Result<Box<dyn PageSession>, FetchError>;
}

#[async_trait]
pub trait PageSession: Send {
    /// Record a geolocation override for subsequent navigation. Best-effort:
    /// failure here is observable only via absence of effect, never via a
    /// propagated error.
    fn grant_geolocation(&mut self, lat: f64, lng: f64);

    async fn goto(&mut self, url: &str, timeout: Duration)
        -> std::result::Result<(), FetchError>;

    /// Wait for a basic readiness signal, bounded by `timeout`. Callers treat
    /// a readiness failure as non-fatal and proceed with what rendered.
    async fn wait_ready(&mut self, timeout: Duration) -> std::result::Result<(), FetchError>;

    /// Matched element texts, de-duplicated, first-seen order.
    async fn find_text(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String>;

    /// Matched element texts, one entry per matched element.
    async fn find_text_raw(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String>;

    /// Release session resources. Safe to call multiple times, never fails.
    async fn close(&mut self);
}

#[async_trait]
impl PageFetcher for BrowserlessClient {
    async fn open(&self) -> std::result::Result<Box<dyn PageSession>, FetchError> {
        Ok(Box::new(self.open_session()))
    }
}

#[async_trait]
impl PageSession for RenderSession {
    fn grant_geolocation(&mut self, lat: f64, lng: f64) {
        RenderSession::grant_geolocation(self, lat, lng);
    }

    async fn goto(&mut self, url: &str, timeout: Duration)
        -> std::result::Result<(), FetchError> {
        RenderSession::goto(self, url, timeout)
            .await
            .map_err(|e| match e {
                BrowserlessError::RenderTimeout => FetchError::LoadTimeout,
                other => FetchError::LoadError(other.to_string()),
            })
    }

    async fn wait_ready(&mut self, _timeout: Duration) -> std::result::Result<(), FetchError> {
        // The service renders before returning from goto, so readiness is a
        // property of the held document rather than something to poll for.
        if self.is_ready() {
            Ok(())
        } else {
            Err(FetchError::ReadinessTimeout)
        }
    }

    async fn find_text(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        RenderSession::find_text(self, locators, max_elements)
    }

    async fn find_text_raw(&mut self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        RenderSession::find_text_raw(self, locators, max_elements)
    }

    async fn close(&mut self) {
        RenderSession::close(self);
    }
}

// ---------------------------------------------------------------------------
// Tabular store port
// ---------------------------------------------------------------------------

#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Titles of every tab, in sheet order.
    async fn list_tabs(&self) -> Result<Vec<String>>;

    /// The whole populated grid of a tab. Trailing empty cells and rows may
    /// be absent; callers index defensively.
    async fn read_all(&self, tab: &str) -> Result<Vec<Vec<String>>>;

    /// Write one cell (1-based row/column).
    async fn write_cell(&self, tab: &str, row: u32, col: u32, value: &str) -> Result<()>;

    /// Write a batch of cells in one round trip.
    async fn batch_write(&self, tab: &str, writes: &[CellWrite]) -> Result<()>;
}

#[async_trait]
impl TabularStore for SheetsClient {
    async fn list_tabs(&self) -> Result<Vec<String>> {
        Ok(SheetsClient::list_tabs(self).await?)
    }

    async fn read_all(&self, tab: &str) -> Result<Vec<Vec<String>>> {
        Ok(SheetsClient::read_all(self, tab).await?)
    }

    async fn write_cell(&self, tab: &str, row: u32, col: u32, value: &str) -> Result<()> {
        Ok(SheetsClient::write_cell(self, tab, row, col, value).await?)
    }

    async fn batch_write(&self, tab: &str, writes: &[CellWrite]) -> Result<()> {
        let updates: Vec<(u32, u32, String)> = writes
            .iter()
            .map(|w| (w.row, w.col, w.value.clone()))
            .collect();
        Ok(SheetsClient::batch_write(self, tab, &updates).await?)
    }
}
