//! Daily cadence for the acquisition run.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::future::Future;
use tracing::{debug, info};

/// Fires once a day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Today at `at` if that is still ahead of `from`, otherwise tomorrow.
    pub fn next_occurrence(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        let today = from.date_naive().and_time(self.at);
        let today_utc = DateTime::<Utc>::from_naive_utc_and_offset(today, Utc);

        if today_utc > from {
            today_utc
        } else {
            today_utc + Duration::days(1)
        }
    }
}

/// Runs `job` at every occurrence of `schedule` until `shutdown` resolves.
///
/// `clock` supplies the current time before each wait; production callers pass
/// `Utc::now`. Returns the number of completed runs. A run in progress is
/// finished before shutdown is observed.
pub async fn run_daily<C, F, Fut, S>(
    schedule: DailySchedule,
    clock: C,
    mut job: F,
    shutdown: S,
) -> usize
where
    C: Fn() -> DateTime<Utc>,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut runs = 0;

    loop {
        let now = clock();
        let next = schedule.next_occurrence(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, "Waiting for next acquisition run");

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                debug!(runs, "Scheduler shutting down");
                return runs;
            }
            _ = tokio::time::sleep(wait) => {
                job().await;
                runs += 1;
            }
        }
    }
}
