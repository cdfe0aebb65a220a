//! Blocking adapter for asynchronous callbacks.
//!
//! A [`SyncRunner`] stands in for a [`NotificationSink`]: it forwards each
//! callback to an optional delegate and then releases whoever is blocked in
//! [`SyncRunner::wait_for_response`]. Test code uses it to turn
//! "request and get called back later" into a plain blocking call.
//!
//! ```rust,ignore
//! let runner = Arc::new(SyncRunner::new().with_timeout(Duration::from_secs(5)));
//! let sink = Arc::clone(&runner);
//! assert!(runner.wait_for_response_from(|| engine.request(identity, sink)));
//! assert!(runner.outcome().unwrap().is_success());
//! ```
//!
//! Never wait on a thread the callback needs to run on.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::core::{FetchError, NotificationSink};
use crate::domain::AssetIdentity;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_TIMEOUT_RESOLUTION: Duration = Duration::from_millis(10);

/// Last callback a runner observed
#[derive(Debug, Clone)]
pub enum Outcome {
    Succeeded {
        identity: AssetIdentity,
        image: Arc<DynamicImage>,
    },
    Failed {
        identity: AssetIdentity,
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    pub fn identity(&self) -> &AssetIdentity {
        match self {
            Outcome::Succeeded { identity, .. } | Outcome::Failed { identity, .. } => identity,
        }
    }
}

#[derive(Debug, Default)]
struct Signal {
    released: bool,
    outcome: Option<Outcome>,
}

/// Blocks a thread until a callback arrives, a manual release, or a timeout
pub struct SyncRunner {
    /// Forwarding target, held weakly so the runner never keeps it alive
    callback_delegate: Option<Weak<dyn NotificationSink>>,

    /// How long to wait before declaring a timeout
    timeout: Duration,

    /// How often the waiter wakes to re-check the deadline
    timeout_resolution: Duration,

    signal: Mutex<Signal>,
    cond: Condvar,
}

impl Default for SyncRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncRunner {
    /// Create a runner with the default 20s timeout and no delegate
    pub fn new() -> Self {
        Self {
            callback_delegate: None,
            timeout: DEFAULT_TIMEOUT,
            timeout_resolution: DEFAULT_TIMEOUT_RESOLUTION,
            signal: Mutex::new(Signal::default()),
            cond: Condvar::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_resolution(mut self, resolution: Duration) -> Self {
        self.timeout_resolution = resolution.max(Duration::from_millis(1));
        self
    }

    /// Forward callbacks to `delegate` while it is alive
    pub fn with_delegate<S>(mut self, delegate: &Arc<S>) -> Self
    where
        S: NotificationSink + 'static,
    {
        let weak: Weak<dyn NotificationSink> = Arc::<S>::downgrade(delegate);
        self.callback_delegate = Some(weak);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_resolution(&self) -> Duration {
        self.timeout_resolution
    }

    fn lock(&self) -> MutexGuard<'_, Signal> {
        self.signal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until released; false if the timeout elapsed first
    pub fn wait_for_response(&self) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut signal = self.lock();

        while !signal.released {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            let slice = self.timeout_resolution.min(deadline - now);
            signal = self
                .cond
                .wait_timeout(signal, slice)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }

        true
    }

    /// Run `trigger`, then block as [`SyncRunner::wait_for_response`] does
    pub fn wait_for_response_from<F>(&self, trigger: F) -> bool
    where
        F: FnOnce(),
    {
        trigger();
        self.wait_for_response()
    }

    /// Release the waiter without a callback
    pub fn stop_waiting(&self) {
        self.lock().released = true;
        self.cond.notify_all();
    }

    /// Clear the released state and last outcome for reuse
    pub fn reset(&self) {
        *self.lock() = Signal::default();
    }

    /// Whether the runner has been released since the last reset
    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Last observed callback, if any
    pub fn outcome(&self) -> Option<Outcome> {
        self.lock().outcome.clone()
    }

    fn release_with(&self, outcome: Outcome) {
        let mut signal = self.lock();
        signal.outcome = Some(outcome);
        signal.released = true;
        drop(signal);
        self.cond.notify_all();
    }

    fn delegate(&self) -> Option<Arc<dyn NotificationSink>> {
        self.callback_delegate.as_ref().and_then(Weak::upgrade)
    }
}

impl NotificationSink for SyncRunner {
    fn on_success(&self, image: Arc<DynamicImage>, identity: &AssetIdentity) {
        if let Some(delegate) = self.delegate() {
            delegate.on_success(Arc::clone(&image), identity);
        }

        self.release_with(Outcome::Succeeded {
            identity: identity.clone(),
            image,
        });
    }

    fn on_failure(&self, error: &FetchError, identity: &AssetIdentity) {
        if let Some(delegate) = self.delegate() {
            delegate.on_failure(error, identity);
        }

        self.release_with(Outcome::Failed {
            identity: identity.clone(),
            message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_times_out_without_callback() {
        let runner = SyncRunner::new()
            .with_timeout(Duration::from_millis(50))
            .with_timeout_resolution(Duration::from_millis(5));

        let start = Instant::now();
        assert!(!runner.wait_for_response());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(runner.outcome().is_none());
    }

    #[test]
    fn test_released_before_wait_returns_immediately() {
        let runner = SyncRunner::new();
        runner.stop_waiting();

        assert!(runner.wait_for_response());
        assert!(runner.is_released());
    }

    #[test]
    fn test_reset_clears_state() {
        let runner = SyncRunner::new().with_timeout(Duration::from_millis(20));
        runner.on_failure(
            &crate::core::DecodeError::new("bad").into(),
            &AssetIdentity::new("http://host/a.png"),
        );
        assert!(runner.is_released());

        runner.reset();
        assert!(!runner.is_released());
        assert!(runner.outcome().is_none());
        assert!(!runner.wait_for_response());
    }

    #[test]
    fn test_default_settings() {
        let runner = SyncRunner::default();
        assert_eq!(runner.timeout(), Duration::from_secs(20));
        assert_eq!(runner.timeout_resolution(), Duration::from_millis(10));
    }
}
