//! Fan one tab's jobs out to a bounded worker pool and collect outcomes.
//!
//! Completion order is arbitrary and never affects the result: the map is
//! keyed by row, and every submitted row ends up with exactly one outcome.
//! A failed check becomes that row's outcome string; it cannot take other
//! rows down with it.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::sleep;

use storewatch_common::{Config, StoreJob};

use crate::checker::StoreChecker;

/// One row's work unit: either a job to run, or an outcome already known
/// at row-parse time (missing data).
#[derive(Debug)]
pub enum JobSlot {
    Ready(StoreJob),
    Resolved(String),
}

pub struct TabOrchestrator {
    checker: StoreChecker,
    max_workers: usize,
    pacing: Duration,
}

impl TabOrchestrator {
    pub fn new(checker: StoreChecker, config: &Config) -> Self {
        Self {
            checker,
            max_workers: config.max_workers.max(1),
            pacing: config.between_stores,
        }
    }

    /// Run every slot to an outcome. The returned map's key set equals the
    /// input row set exactly.
    pub async fn run_tab(&self, slots: Vec<(u32, JobSlot)>) -> HashMap<u32, String> {
        let mut results = HashMap::new();
        let mut ready = Vec::new();

        for (row, slot) in slots {
            match slot {
                JobSlot::Resolved(outcome) => {
                    results.insert(row, outcome);
                }
                JobSlot::Ready(job) => ready.push((row, job)),
            }
        }

        let checker = &self.checker;
        let mut completions = stream::iter(ready.into_iter().map(|(row, job)| async move {
            (row, checker.check(&job).await)
        }))
        .buffer_unordered(self.max_workers);

        while let Some((row, outcome)) = completions.next().await {
            let compact = match outcome {
                Ok(compact) => compact,
                Err(e) => format!("Error: {}", e.kind()),
            };
            results.insert(row, compact);
            // Throttle downstream effects regardless of completion order.
            sleep(self.pacing).await;
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use storewatch_common::{PageFragments, MISSING_DATA};

    use crate::testing::{test_config, MockFetcher};

    fn available(url: &str) -> (String, PageFragments) {
        (
            url.to_string(),
            PageFragments {
                eta: vec!["20 mins".to_string()],
                ..Default::default()
            },
        )
    }

    fn job(row: u32, url: &str) -> (u32, JobSlot) {
        (
            row,
            JobSlot::Ready(StoreJob {
                row,
                aggregator: "Swiggy".to_string(),
                url: url.to_string(),
                lat: None,
                lng: None,
            }),
        )
    }

    fn orchestrator(fetcher: Arc<MockFetcher>, max_workers: usize) -> TabOrchestrator {
        let mut config = test_config();
        config.max_workers = max_workers;
        let checker = StoreChecker::new(fetcher, config.clone());
        TabOrchestrator::new(checker, &config)
    }

    #[tokio::test]
    async fn every_row_gets_exactly_one_outcome() {
        for pool_size in [1, 5] {
            let mut fetcher = MockFetcher::new();
            for i in 0..6 {
                let (url, fragments) = available(&format!("https://www.swiggy.com/{i}"));
                fetcher = fetcher.on_url(&url, fragments);
            }
            let orchestrator = orchestrator(Arc::new(fetcher), pool_size);

            let mut slots: Vec<(u32, JobSlot)> = (0..6)
                .map(|i| job(3 + i, &format!("www.swiggy.com/{i}")))
                .collect();
            slots.push((9, JobSlot::Resolved(MISSING_DATA.to_string())));

            let results = orchestrator.run_tab(slots).await;

            let expected: HashSet<u32> = (3..9).chain([9]).collect();
            let got: HashSet<u32> = results.keys().copied().collect();
            assert_eq!(got, expected, "pool_size={pool_size}");
            assert_eq!(results[&9], MISSING_DATA);
            for row in 3..9 {
                assert_eq!(results[&row], "Available | 20 mins");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_job_does_not_poison_the_rest() {
        let (ok_url, fragments) = available("https://www.swiggy.com/ok");
        let fetcher = Arc::new(
            MockFetcher::new()
                .on_url(&ok_url, fragments)
                .failing_url("https://www.swiggy.com/down"),
        );
        let orchestrator = orchestrator(fetcher, 3);

        let results = orchestrator
            .run_tab(vec![job(3, "www.swiggy.com/ok"), job(4, "www.swiggy.com/down")])
            .await;

        assert_eq!(results[&3], "Available | 20 mins");
        assert_eq!(results[&4], "Error: LoadError");
    }

    #[tokio::test(start_paused = true)]
    async fn session_open_failures_surface_as_row_errors() {
        let fetcher = Arc::new(MockFetcher::new().failing_opens(u32::MAX));
        let orchestrator = orchestrator(fetcher, 2);

        let results = orchestrator.run_tab(vec![job(3, "www.swiggy.com/x")]).await;
        assert_eq!(results[&3], "Error: SessionFailed");
    }

    #[tokio::test]
    async fn resolved_slots_skip_scheduling_entirely() {
        // A fetcher with no registered URLs would produce Unknown outcomes;
        // resolved slots must never reach it.
        let fetcher = Arc::new(MockFetcher::new());
        let orchestrator = orchestrator(fetcher.clone(), 2);

        let results = orchestrator
            .run_tab(vec![
                (3, JobSlot::Resolved(MISSING_DATA.to_string())),
                (4, JobSlot::Resolved(MISSING_DATA.to_string())),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(fetcher.opens(), 0);
    }
}
