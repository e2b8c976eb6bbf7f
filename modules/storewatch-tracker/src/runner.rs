//! Periodic cycle runner: lock-file mutual exclusion with stale recovery,
//! interval-boundary alignment with jitter, and a dated cycle log.

use std::fs::{self, OpenOptions};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Timelike, Utc};
use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use storewatch_common::{fixed_offset, Config};

/// A lock file older than this is treated as abandoned and removed.
const LOCK_STALE_AFTER: Duration = Duration::from_secs(2 * 3600);

const LOCK_FILE: &str = "storewatch.lock";
const LOG_DIR: &str = "logs";

// ---------------------------------------------------------------------------
// CycleLock
// ---------------------------------------------------------------------------

/// Exclusive-create lock file, released on drop.
pub struct CycleLock {
    path: PathBuf,
}

impl CycleLock {
    pub fn acquire(path: &Path) -> Option<CycleLock> {
        Self::acquire_with(path, LOCK_STALE_AFTER)
    }

    /// Acquire with an explicit staleness threshold. Returns None when a
    /// live lock is held elsewhere.
    pub fn acquire_with(path: &Path, stale_after: Duration) -> Option<CycleLock> {
        if Self::try_create(path) {
            return Some(CycleLock {
                path: path.to_path_buf(),
            });
        }

        if Self::is_stale(path, stale_after) {
            warn!(path = %path.display(), "Removing stale cycle lock");
            let _ = fs::remove_file(path);
            if Self::try_create(path) {
                return Some(CycleLock {
                    path: path.to_path_buf(),
                });
            }
        }

        None
    }

    fn try_create(path: &Path) -> bool {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .is_ok()
    }

    fn is_stale(path: &Path, stale_after: Duration) -> bool {
        fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .map(|age| age > stale_after)
            .unwrap_or(false)
    }
}

impl Drop for CycleLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

// ---------------------------------------------------------------------------
// Slot alignment
// ---------------------------------------------------------------------------

/// The next interval boundary after `now`: for a 15-minute interval, the
/// next of :00/:15/:30/:45. An exact boundary rolls to the following slot.
pub fn next_slot(now: DateTime<FixedOffset>, interval_minutes: u32) -> DateTime<FixedOffset> {
    let interval = interval_minutes.clamp(1, 60);
    let next_minute = ((now.minute() / interval) + 1) * interval;
    let minutes_ahead = i64::from(next_minute - now.minute());

    let minute_floor = now
        - ChronoDuration::seconds(i64::from(now.second()))
        - ChronoDuration::nanoseconds(i64::from(now.nanosecond()));
    minute_floor + ChronoDuration::minutes(minutes_ahead)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct Runner {
    interval_minutes: u32,
    offset: FixedOffset,
    lock_path: PathBuf,
    log_dir: PathBuf,
}

impl Runner {
    pub fn new(config: &Config) -> Self {
        Self {
            interval_minutes: config.interval_minutes,
            offset: fixed_offset(config.utc_offset_minutes),
            lock_path: PathBuf::from(LOCK_FILE),
            log_dir: PathBuf::from(LOG_DIR),
        }
    }

    /// Run `cycle` now and then on every interval boundary, forever. Each
    /// boundary gets 5-20 s of jitter so cycles don't land on the exact
    /// minute edge.
    pub async fn run_forever<F, Fut>(&self, mut cycle: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        loop {
            match CycleLock::acquire(&self.lock_path) {
                Some(_lock) => {
                    self.log_line("Starting tracker cycle");
                    match cycle().await {
                        Ok(()) => self.log_line("Cycle finished"),
                        Err(e) => self.log_line(&format!("Cycle failed: {e:#}")),
                    }
                    // Lock released here.
                }
                None => {
                    self.log_line("Another cycle appears to be active (lock present), skipping");
                }
            }

            let now = Utc::now().with_timezone(&self.offset);
            let target = next_slot(now, self.interval_minutes);
            let jitter = Duration::from_secs(rand::rng().random_range(5..=20));
            let wait = (target - now).to_std().unwrap_or_default() + jitter;
            info!(seconds = wait.as_secs(), "Sleeping until next cycle slot");
            sleep(wait).await;
        }
    }

    /// Write one line to the dated cycle log, mirrored to tracing. Log-file
    /// trouble never fails a cycle.
    fn log_line(&self, message: &str) {
        info!("{message}");

        let now = Utc::now().with_timezone(&self.offset);
        let stamped = format!("[{}] {message}\n", now.format("%Y-%m-%d %H:%M:%S"));
        let path = self
            .log_dir
            .join(format!("tracker_{}.log", now.format("%Y%m%d")));

        let write = || -> std::io::Result<()> {
            fs::create_dir_all(&self.log_dir)?;
            let mut file = OpenOptions::new().append(true).create(true).open(&path)?;
            file.write_all(stamped.as_bytes())
        };
        if let Err(e) = write() {
            warn!(path = %path.display(), error = %e, "Failed to write cycle log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn next_slot_rounds_up_to_interval() {
        assert_eq!(
            next_slot(at("2026-08-07T10:07:30+05:30"), 15),
            at("2026-08-07T10:15:00+05:30")
        );
        assert_eq!(
            next_slot(at("2026-08-07T10:44:59+05:30"), 15),
            at("2026-08-07T10:45:00+05:30")
        );
    }

    #[test]
    fn next_slot_rolls_over_the_hour() {
        assert_eq!(
            next_slot(at("2026-08-07T10:59:59+05:30"), 15),
            at("2026-08-07T11:00:00+05:30")
        );
        assert_eq!(
            next_slot(at("2026-08-07T23:50:00+05:30"), 15),
            at("2026-08-08T00:00:00+05:30")
        );
    }

    #[test]
    fn exact_boundary_moves_to_the_next_slot() {
        assert_eq!(
            next_slot(at("2026-08-07T10:15:00+05:30"), 15),
            at("2026-08-07T10:30:00+05:30")
        );
    }

    #[test]
    fn lock_is_exclusive_until_released() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.lock");

        let lock = CycleLock::acquire(&path).expect("first acquire");
        assert!(CycleLock::acquire(&path).is_none(), "held lock must block");

        drop(lock);
        assert!(!path.exists(), "drop must remove the lock file");
        assert!(CycleLock::acquire(&path).is_some());
    }

    #[test]
    fn stale_lock_is_recovered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycle.lock");
        std::fs::write(&path, b"").unwrap();

        // Zero threshold makes any existing lock stale.
        std::thread::sleep(Duration::from_millis(10));
        let lock = CycleLock::acquire_with(&path, Duration::ZERO);
        assert!(lock.is_some(), "stale lock must be removed and re-acquired");
    }
}
