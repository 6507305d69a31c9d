//! Leading-edge debounce with a single coalesced trailing run.
//!
//! ```text
//! idle --trigger--> run --> cooldown --window elapsed, nothing armed--> idle
//!                            |    ^
//!          trigger: arm,     |    |
//!          restart window    v    |
//!                          (armed) --window elapsed--> run --> cooldown
//! ```
//!
//! The first trigger after a quiet period runs immediately. Triggers during
//! the cooldown collapse into one trailing run, fired once no trigger has
//! arrived for a full window. Under a trigger storm that never goes quiet the
//! trailing run is forced after [`MAX_DELAY_WINDOWS`] windows, so a
//! sustained storm still publishes at that cadence.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Upper bound on one cooldown, in windows.
pub(crate) const MAX_DELAY_WINDOWS: u32 = 10;

pub(crate) struct Debouncer {
    notify: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debounce task on the current Tokio runtime.
    ///
    /// `run` executes on the task, never concurrently with itself.
    pub fn spawn<F>(window: Duration, run: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let notify = Arc::new(Notify::new());
        let worker = tokio::spawn(run_loop(Arc::clone(&notify), window, run));
        Self { notify, worker }
    }

    /// Request a run. Never blocks and never runs `run` on the caller.
    pub fn trigger(&self) {
        tracing::trace!("Debounce triggered");
        self.notify.notify_one();
    }

    /// Stop the task. A pending trailing run is dropped; a run already in
    /// progress finishes because `run` has no await points.
    pub fn cancel(&self) {
        self.worker.abort();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_loop<F>(notify: Arc<Notify>, window: Duration, mut run: F)
where
    F: FnMut(),
{
    loop {
        notify.notified().await;
        run();
        while cooldown(&notify, window).await {
            run();
        }
    }
}

/// Wait out one cooldown. Returns whether a trailing run was armed.
async fn cooldown(notify: &Notify, window: Duration) -> bool {
    let deadline = Instant::now() + window * MAX_DELAY_WINDOWS;
    let mut armed = false;
    let sleep = time::sleep(window);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return armed,
            () = notify.notified() => {
                armed = true;
                sleep.as_mut().reset((Instant::now() + window).min(deadline));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WINDOW: Duration = Duration::from_millis(100);

    fn counting(window: Duration) -> (Debouncer, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&runs);
        let debouncer = Debouncer::spawn(window, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, runs)
    }

    /// Let the debounce task process everything that is ready now.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_trigger_runs_immediately() {
        let (debouncer, runs) = counting(WINDOW);
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        debouncer.trigger();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        time::sleep(WINDOW * 3).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_trailing_run() {
        let (debouncer, runs) = counting(WINDOW);
        debouncer.trigger();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        for _ in 0..10 {
            debouncer.trigger();
            time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        time::sleep(WINDOW * 3).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_run_waits_for_quiet_window() {
        let (debouncer, runs) = counting(WINDOW);
        debouncer.trigger();
        settle().await;

        // Keep triggering inside the window: the trailing run keeps moving.
        for _ in 0..5 {
            time::sleep(Duration::from_millis(60)).await;
            debouncer.trigger();
            settle().await;
            assert_eq!(runs.load(Ordering::SeqCst), 1);
        }

        time::sleep(WINDOW + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_storm_still_runs_at_max_delay() {
        let (debouncer, runs) = counting(WINDOW);
        debouncer.trigger();
        settle().await;

        // Triggers every 30ms never leave a quiet window; the trailing run is
        // forced once the cooldown hits its cap at 1000ms.
        for _ in 0..40 {
            time::sleep(Duration::from_millis(30)).await;
            debouncer.trigger();
            settle().await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        time::sleep(WINDOW * 2).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_after_quiet_period_runs_immediately_again() {
        let (debouncer, runs) = counting(WINDOW);
        debouncer.trigger();
        settle().await;
        time::sleep(WINDOW * 2).await;

        debouncer.trigger();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_trailing_run() {
        let (debouncer, runs) = counting(WINDOW);
        debouncer.trigger();
        settle().await;
        debouncer.trigger();
        settle().await;

        debouncer.cancel();
        time::sleep(WINDOW * 3).await;
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        debouncer.trigger();
        settle().await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
