//! Background polling subscription for in-flight documents.
//!
//! A scoped resource: dropping the handle signals the worker and joins it,
//! so a subscription can never outlive its owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{info, warn};

/// Fixed polling cadence.
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Sleep slice so shutdown is picked up without waiting a full interval.
const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// Handle to a running polling subscription.
pub struct PollHandle {
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Signal the worker and wait for it to exit.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Polling worker panicked during shutdown");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start polling every ten seconds until the pending count reaches zero.
///
/// `poll` reports the current number of in-flight documents; an `Err`
/// string is logged and the subscription keeps going. `on_update` receives
/// each observed count. When the count hits zero, `on_complete` fires once
/// and the worker exits on its own.
pub fn start_polling<P, U, C>(poll: P, on_update: U, on_complete: C) -> PollHandle
where
    P: Fn() -> Result<usize, String> + Send + 'static,
    U: Fn(usize) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let worker = thread::spawn(move || {
        info!("Polling subscription started");
        let mut on_complete = Some(on_complete);

        loop {
            if shutdown_flag.load(Ordering::SeqCst) {
                break;
            }

            match poll() {
                Ok(pending) => {
                    on_update(pending);
                    if pending == 0 {
                        if let Some(notify) = on_complete.take() {
                            notify();
                        }
                        info!("All documents settled, polling subscription done");
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Poll iteration failed");
                }
            }

            // Sliced sleep keeps shutdown latency well under the interval.
            let mut slept = Duration::ZERO;
            while slept < POLL_INTERVAL {
                if shutdown_flag.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(SLEEP_SLICE);
                slept += SLEEP_SLICE;
            }
        }

        info!("Polling subscription stopped");
    });

    PollHandle {
        shutdown,
        worker: Some(worker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn completes_once_when_count_reaches_zero() {
        let completions = Arc::new(AtomicUsize::new(0));
        let completions_seen = Arc::clone(&completions);
        let observed = Arc::new(Mutex::new(Vec::new()));
        let observed_sink = Arc::clone(&observed);

        let mut handle = start_polling(
            || Ok(0),
            move |count| observed_sink.lock().unwrap().push(count),
            move || {
                completions_seen.fetch_add(1, Ordering::SeqCst);
            },
        );

        // First poll happens before any sleep; the worker then exits.
        let started = std::time::Instant::now();
        while completions.load(Ordering::SeqCst) == 0
            && started.elapsed() < Duration::from_secs(5)
        {
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert_eq!(observed.lock().unwrap().as_slice(), &[0]);
        handle.shutdown();
    }

    #[test]
    fn shutdown_stops_worker_before_completion() {
        let completed = Arc::new(AtomicBool::new(false));
        let completed_flag = Arc::clone(&completed);

        let mut handle = start_polling(
            || Ok(3),
            |_| {},
            move || completed_flag.store(true, Ordering::SeqCst),
        );

        thread::sleep(Duration::from_millis(50));
        handle.shutdown();
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[test]
    fn drop_joins_the_worker() {
        let handle = start_polling(|| Ok(5), |_| {}, || {});
        drop(handle);
        // Reaching this line means drop did not hang.
    }
}
