use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Spreadsheet
    pub sheet_id: String,
    pub sheets_token: String,
    /// Tabs to process. Empty means every tab in the spreadsheet.
    pub input_tabs: Vec<String>,

    // Rendering service
    pub browserless_url: String,
    pub browserless_token: Option<String>,

    // Timestamps are stamped in this fixed offset (minutes east of UTC).
    pub utc_offset_minutes: i32,

    // Check timing
    pub pageload_timeout: Duration,
    pub after_load_wait: Duration,
    pub readiness_timeout: Duration,
    pub between_stores: Duration,
    pub max_workers: usize,

    // Periodic runner
    pub interval_minutes: u32,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            sheet_id: required_env("SHEET_ID"),
            sheets_token: required_env("SHEETS_API_TOKEN"),
            input_tabs: env::var("INPUT_TABS")
                .unwrap_or_default()
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            browserless_url: required_env("BROWSERLESS_URL"),
            browserless_token: env::var("BROWSERLESS_TOKEN").ok().filter(|t| !t.is_empty()),
            utc_offset_minutes: parsed_env("UTC_OFFSET_MINUTES", 330),
            pageload_timeout: Duration::from_secs(parsed_env("PAGELOAD_TIMEOUT", 45)),
            after_load_wait: Duration::from_secs(parsed_env("AFTER_LOAD_WAIT", 10)),
            readiness_timeout: Duration::from_secs(parsed_env("READINESS_TIMEOUT", 15)),
            between_stores: Duration::from_secs_f64(parsed_env("BETWEEN_STORES_SECONDS", 1.0)),
            max_workers: parsed_env::<usize>("MAX_WORKERS", 5).max(1),
            interval_minutes: parsed_env::<u32>("RUN_INTERVAL_MINUTES", 15).max(1),
        }
    }

    /// Log the non-secret parts of the configuration at startup.
    pub fn log_redacted(&self) {
        tracing::info!(
            sheet_id = self.sheet_id.as_str(),
            tabs = self.input_tabs.len(),
            browserless_url = self.browserless_url.as_str(),
            max_workers = self.max_workers,
            interval_minutes = self.interval_minutes,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number")),
        Err(_) => default,
    }
}
