//! One store check: fetch, settle, collect fragments, extract, render.
//!
//! Every check owns a fresh session per attempt and closes it on every exit
//! path. The whole attempt (session open included) retries once on failure
//! with a fixed delay; retry exhaustion surfaces as a typed `FetchError`
//! that the orchestrator turns into a row outcome.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use storewatch_common::{Aggregator, Config, PageFragments, StoreJob, MISSING_DATA};

use crate::extractor::extract;
use crate::rules::{self, MAX_ELEMENTS, SOLDOUT_SCAN_LIMIT};
use crate::traits::{FetchError, PageFetcher, PageSession};

/// Total attempts per check, fresh session each.
const CHECK_ATTEMPTS: u32 = 2;

/// Fixed delay between attempts.
const RETRY_DELAY: Duration = Duration::from_secs(2);

pub struct StoreChecker {
    fetcher: Arc<dyn PageFetcher>,
    config: Config,
}

impl StoreChecker {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: Config) -> Self {
        Self { fetcher, config }
    }

    /// Produce this job's compact status string, or the typed failure of the
    /// final attempt. A job with missing data short-circuits without ever
    /// touching the fetch port.
    pub async fn check(&self, job: &StoreJob) -> Result<String, FetchError> {
        let Some(aggregator) = Aggregator::from_cell(&job.aggregator) else {
            return Ok(MISSING_DATA.to_string());
        };
        if job.url.trim().is_empty() {
            return Ok(MISSING_DATA.to_string());
        }

        let url = normalize_url(&job.url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(&url, aggregator, job).await {
                Ok(compact) => return Ok(compact),
                Err(e) if attempt < CHECK_ATTEMPTS => {
                    warn!(
                        url = url.as_str(),
                        row = job.row,
                        attempt,
                        error = %e,
                        "Store check attempt failed, retrying"
                    );
                    sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    warn!(
                        url = url.as_str(),
                        row = job.row,
                        attempts = attempt,
                        error = %e,
                        "Store check failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// One attempt with its own session. The session closes whether the
    /// drive succeeds or not.
    async fn attempt(
        &self,
        url: &str,
        aggregator: Aggregator,
        job: &StoreJob,
    ) -> Result<String, FetchError> {
        let mut session = self.fetcher.open().await?;
        let result = self.drive(session.as_mut(), url, aggregator, job).await;
        session.close().await;
        result
    }

    async fn drive(
        &self,
        session: &mut dyn PageSession,
        url: &str,
        aggregator: Aggregator,
        job: &StoreJob,
    ) -> Result<String, FetchError> {
        if let (Some(lat), Some(lng)) = (job.lat, job.lng) {
            session.grant_geolocation(lat, lng);
        }

        session.goto(url, self.config.pageload_timeout).await?;

        // Let late-hydrating content land before we look at the page.
        sleep(self.config.after_load_wait).await;

        if let Err(e) = session.wait_ready(self.config.readiness_timeout).await {
            warn!(url, error = %e, "Readiness wait failed, proceeding with partial content");
        }

        let set = rules::locators(aggregator);
        let fragments = PageFragments {
            status: session.find_text(set.status, MAX_ELEMENTS).await,
            eta: session.find_text(set.eta, MAX_ELEMENTS).await,
            sold_out: if set.sold_out.is_empty() {
                Vec::new()
            } else {
                session.find_text_raw(set.sold_out, SOLDOUT_SCAN_LIMIT).await
            },
        };

        Ok(extract(&fragments, aggregator).render())
    }
}

/// Give bare URLs an explicit scheme.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{}", raw.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_config, MockFetcher};

    fn job(aggregator: &str, url: &str) -> StoreJob {
        StoreJob {
            row: 3,
            aggregator: aggregator.to_string(),
            url: url.to_string(),
            lat: Some(12.97),
            lng: Some(77.59),
        }
    }

    #[test]
    fn normalize_url_adds_scheme() {
        assert_eq!(
            normalize_url("www.swiggy.com/restaurants/x"),
            "https://www.swiggy.com/restaurants/x"
        );
        assert_eq!(
            normalize_url("//www.zomato.com/bangalore/x"),
            "https://www.zomato.com/bangalore/x"
        );
        assert_eq!(
            normalize_url("https://www.swiggy.com/x"),
            "https://www.swiggy.com/x"
        );
    }

    #[tokio::test]
    async fn missing_data_never_touches_the_fetcher() {
        let fetcher = Arc::new(MockFetcher::new());
        let checker = StoreChecker::new(fetcher.clone(), test_config());

        let outcome = checker.check(&job("", "www.swiggy.com/x")).await.unwrap();
        assert_eq!(outcome, MISSING_DATA);

        let outcome = checker.check(&job("Swiggy", "  ")).await.unwrap();
        assert_eq!(outcome, MISSING_DATA);

        assert_eq!(fetcher.opens(), 0);
    }

    #[tokio::test]
    async fn successful_check_renders_status() {
        let fetcher = Arc::new(MockFetcher::new().on_url(
            "https://www.swiggy.com/x",
            PageFragments {
                status: vec!["Opens at 9:00 PM".to_string()],
                eta: vec!["25-30 mins".to_string()],
                sold_out: Vec::new(),
            },
        ));
        let checker = StoreChecker::new(fetcher.clone(), test_config());

        let outcome = checker
            .check(&job("Swiggy", "www.swiggy.com/x"))
            .await
            .unwrap();
        assert_eq!(outcome, "Opens at 9:00 PM | 25-30 mins");
        assert_eq!(fetcher.opens(), 1);
        assert_eq!(fetcher.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_retries_and_succeeds() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .on_url(
                    "https://www.swiggy.com/x",
                    PageFragments {
                        status: vec!["Open now".to_string()],
                        eta: vec!["20 mins".to_string()],
                        sold_out: Vec::new(),
                    },
                )
                .failing_gotos(1),
        );
        let checker = StoreChecker::new(fetcher.clone(), test_config());

        let outcome = checker
            .check(&job("Swiggy", "www.swiggy.com/x"))
            .await
            .unwrap();
        assert_eq!(outcome, "Available | 20 mins");
        // Two sessions: one failed attempt, one successful retry — both closed.
        assert_eq!(fetcher.opens(), 2);
        assert_eq!(fetcher.closes(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_returns_the_final_error() {
        let fetcher = Arc::new(MockFetcher::new().failing_gotos(u32::MAX));
        let checker = StoreChecker::new(fetcher.clone(), test_config());

        let err = checker
            .check(&job("Zomato", "www.zomato.com/x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "LoadError");
        assert_eq!(fetcher.opens(), 2);
        assert_eq!(fetcher.closes(), 2);
    }

    #[tokio::test]
    async fn readiness_failure_is_not_fatal() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .on_url(
                    "https://www.zomato.com/x",
                    PageFragments {
                        status: vec!["Temporarily closed".to_string()],
                        ..Default::default()
                    },
                )
                .never_ready(),
        );
        let checker = StoreChecker::new(fetcher, test_config());

        let outcome = checker
            .check(&job("Zomato", "www.zomato.com/x"))
            .await
            .unwrap();
        assert_eq!(outcome, "Closed");
    }
}
