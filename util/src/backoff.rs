//! A generic retrying-poll primitive with cooperative cancellation
//!
//! Callers supply an async probe and a completion predicate; the poller
//! invokes the probe with multiplicatively increasing delay until the
//! predicate holds, the caller cancels, or the wall-clock budget elapses.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};

/// The amount to increase the poll delay by after every probe
const BACKOFF_AMPLIFICATION_FACTOR: u32 = 2;
/// The maximum to increase the poll delay to in milliseconds
const BACKOFF_CEILING_MS: u64 = 10_000; // 10 seconds
/// The initial poll delay in milliseconds
const INITIAL_BACKOFF_MS: u64 = 1_000; // 1 second
/// The default wall-clock budget for a poll in milliseconds
const DEFAULT_MAX_ELAPSED_MS: u64 = 120_000; // 2 minutes
/// The number of consecutive probe failures tolerated before giving up
const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 3;

/// A cheaply cloneable cooperative cancellation flag
///
/// Cancellation never aborts an in-flight probe; it only prevents further
/// probes from being scheduled
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Construct a new, unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Configuration for a backoff poll
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    /// The delay before the second and subsequent probes
    pub initial_delay: Duration,
    /// The multiplicative increase in delay after each probe
    pub amplification: u32,
    /// The maximum inter-probe delay
    pub ceiling: Duration,
    /// The wall-clock budget for the whole poll
    pub max_elapsed: Duration,
    /// The number of consecutive probe errors tolerated before the poll
    /// fails with the last error
    pub max_consecutive_errors: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(INITIAL_BACKOFF_MS),
            amplification: BACKOFF_AMPLIFICATION_FACTOR,
            ceiling: Duration::from_millis(BACKOFF_CEILING_MS),
            max_elapsed: Duration::from_millis(DEFAULT_MAX_ELAPSED_MS),
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}

impl PollConfig {
    /// A config with a fixed inter-probe delay and wall-clock budget
    pub fn fixed(delay: Duration, max_elapsed: Duration) -> Self {
        Self {
            initial_delay: delay,
            amplification: 1,
            ceiling: delay,
            max_elapsed,
            ..Default::default()
        }
    }
}

/// The error type emitted by a backoff poll
#[derive(Clone, Debug, Error)]
pub enum PollError<E> {
    /// The caller cancelled the poll before the predicate was satisfied
    #[error("poll cancelled")]
    Cancelled,
    /// The wall-clock budget elapsed before the predicate was satisfied
    #[error("poll timed out")]
    TimedOut,
    /// The probe failed more times in a row than the config tolerates
    #[error("probe failed: {0}")]
    Probe(E),
}

/// Poll the given probe until the predicate is satisfied
///
/// Returns the final probe result. The cancel flag is checked before every
/// probe; if set mid-poll the call fails with [`PollError::Cancelled`]
/// rather than returning a stale result.
pub async fn poll_with_backoff<T, E, F, Fut, P>(
    mut probe: F,
    done: P,
    config: PollConfig,
    cancel: &CancelFlag,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let start = Instant::now();
    let mut delay = config.initial_delay;
    let mut consecutive_errors = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        match probe().await {
            Ok(result) => {
                if done(&result) {
                    return Ok(result);
                }
                consecutive_errors = 0;
            },
            Err(e) => {
                consecutive_errors += 1;
                if consecutive_errors >= config.max_consecutive_errors {
                    return Err(PollError::Probe(e));
                }
            },
        }

        if start.elapsed() + delay > config.max_elapsed {
            return Err(PollError::TimedOut);
        }

        sleep(delay).await;
        delay = Duration::min(delay * config.amplification, config.ceiling);
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{poll_with_backoff, CancelFlag, PollConfig, PollError};

    /// A probe error type for tests
    #[derive(Clone, Debug)]
    struct ProbeFailed;

    /// The poller returns the first result satisfying the predicate
    #[tokio::test(start_paused = true)]
    async fn test_poll_until_done() {
        let counter = Arc::new(AtomicUsize::new(0));
        let probe_counter = counter.clone();

        let res = poll_with_backoff(
            move || {
                let counter = probe_counter.clone();
                async move { Ok::<_, ProbeFailed>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            },
            |n| *n >= 3,
            PollConfig::default(),
            &CancelFlag::new(),
        )
        .await
        .unwrap();

        assert_eq!(res, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    /// A cancelled poll fails with `Cancelled` rather than returning a
    /// stale result
    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let cancel = CancelFlag::new();
        cancel.cancel();

        let res = poll_with_backoff(
            || async { Ok::<_, ProbeFailed>(1) },
            |_| true,
            PollConfig::default(),
            &cancel,
        )
        .await;

        assert!(matches!(res, Err(PollError::Cancelled)));
    }

    /// A poll whose predicate never holds fails once the budget elapses
    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let config = PollConfig {
            max_elapsed: Duration::from_secs(5),
            ..Default::default()
        };

        let res = poll_with_backoff(
            || async { Ok::<_, ProbeFailed>(0) },
            |_| false,
            config,
            &CancelFlag::new(),
        )
        .await;

        assert!(matches!(res, Err(PollError::TimedOut)));
    }

    /// Consecutive probe failures beyond the tolerance surface the last
    /// probe error
    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_bound() {
        let counter = Arc::new(AtomicUsize::new(0));
        let probe_counter = counter.clone();

        let res: Result<u64, _> = poll_with_backoff(
            move || {
                let counter = probe_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(ProbeFailed)
                }
            },
            |_| true,
            PollConfig::default(),
            &CancelFlag::new(),
        )
        .await;

        assert!(matches!(res, Err(PollError::Probe(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
