pub mod error;
pub mod extract;

pub use error::{BrowserlessError, Result};
pub use extract::Locator;

use std::time::Duration;

use scraper::{Html, Selector};

/// Extra headroom on the HTTP request beyond the page-load budget, so the
/// service's own timeout fires first and surfaces as an API error.
const REQUEST_MARGIN: Duration = Duration::from_secs(10);

/// Geolocation override applied to a render, mirroring the service's
/// permission-grant + position-override pair.
#[derive(Debug, Clone, Copy)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

#[derive(Clone)]
pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Start a rendering session. Nothing is fetched until `goto`.
    pub fn open_session(&self) -> RenderSession {
        RenderSession {
            client: self.clone(),
            geolocation: None,
            html: None,
        }
    }

    /// Fetch fully-rendered HTML for a URL via the /content endpoint.
    async fn content(
        &self,
        url: &str,
        timeout: Duration,
        geolocation: Option<Geolocation>,
    ) -> Result<String> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let mut body = serde_json::json!({
            "url": url,
            "bestAttempt": true,
            "gotoOptions": {
                "timeout": timeout.as_millis() as u64,
                "waitUntil": "networkidle2",
            },
        });
        if let Some(geo) = geolocation {
            body["setGeolocation"] = serde_json::json!({
                "latitude": geo.latitude,
                "longitude": geo.longitude,
                "accuracy": geo.accuracy,
            });
        }

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .timeout(timeout + REQUEST_MARGIN)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

/// One rendered-page session. Holds the document from the last `goto`;
/// locator lookups run against that snapshot.
pub struct RenderSession {
    client: BrowserlessClient,
    geolocation: Option<Geolocation>,
    html: Option<String>,
}

impl RenderSession {
    /// Record a geolocation override for subsequent navigations. Whether the
    /// service honors it is observable only through the rendered content.
    pub fn grant_geolocation(&mut self, lat: f64, lng: f64) {
        self.geolocation = Some(Geolocation {
            latitude: lat,
            longitude: lng,
            accuracy: 50.0,
        });
    }

    /// Navigate: render the URL and keep the resulting document.
    pub async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let html = self.client.content(url, timeout, self.geolocation).await?;
        self.html = Some(html);
        Ok(())
    }

    /// Whether the rendered document has a non-empty body.
    pub fn is_ready(&self) -> bool {
        let Some(ref html) = self.html else {
            return false;
        };
        let document = Html::parse_document(html);
        let Ok(body) = Selector::parse("body") else {
            return false;
        };
        document
            .select(&body)
            .next()
            .map(|el| !el.text().collect::<String>().trim().is_empty())
            .unwrap_or(false)
    }

    /// Matched element texts, de-duplicated, first-seen order.
    pub fn find_text(&self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        match self.html {
            Some(ref html) => extract::collect_text(html, locators, max_elements, true),
            None => Vec::new(),
        }
    }

    /// Matched element texts, one entry per matched element (no dedup).
    pub fn find_text_raw(&self, locators: &[Locator], max_elements: usize) -> Vec<String> {
        match self.html {
            Some(ref html) => extract::collect_text(html, locators, max_elements, false),
            None => Vec::new(),
        }
    }

    /// Drop the held document. Safe to call any number of times.
    pub fn close(&mut self) {
        self.html = None;
    }
}
