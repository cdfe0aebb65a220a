//! Callback capability for request outcomes.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use super::error::FetchError;
use crate::domain::AssetIdentity;

/// Receives the outcome of a request.
///
/// Exactly one of the two methods is called, exactly once, per registration.
pub trait NotificationSink: Send + Sync {
    /// The asset is available; `image` is shared with every other sink of the
    /// same fetch
    fn on_success(&self, image: Arc<DynamicImage>, identity: &AssetIdentity);

    /// The request failed terminally
    fn on_failure(&self, error: &FetchError, identity: &AssetIdentity);
}

/// Sink assembled from a pair of closures
pub struct CallbackSink<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> CallbackSink<S, F>
where
    S: Fn(Arc<DynamicImage>, &AssetIdentity) + Send + Sync,
    F: Fn(&FetchError, &AssetIdentity) + Send + Sync,
{
    pub fn new(on_success: S, on_failure: F) -> Self {
        Self {
            on_success,
            on_failure,
        }
    }

    /// Wrap into the shared form the engine registers
    pub fn shared(on_success: S, on_failure: F) -> Arc<Self>
    where
        S: 'static,
        F: 'static,
    {
        Arc::new(Self::new(on_success, on_failure))
    }
}

impl<S, F> NotificationSink for CallbackSink<S, F>
where
    S: Fn(Arc<DynamicImage>, &AssetIdentity) + Send + Sync,
    F: Fn(&FetchError, &AssetIdentity) + Send + Sync,
{
    fn on_success(&self, image: Arc<DynamicImage>, identity: &AssetIdentity) {
        (self.on_success)(image, identity)
    }

    fn on_failure(&self, error: &FetchError, identity: &AssetIdentity) {
        (self.on_failure)(error, identity)
    }
}

impl<S, F> fmt::Debug for CallbackSink<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::core::error::DecodeError;

    #[test]
    fn test_callback_sink_routes_outcomes() {
        let successes = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&successes);
        let f = Arc::clone(&failures);
        let sink = CallbackSink::new(
            move |_: Arc<DynamicImage>, _: &AssetIdentity| {
                s.fetch_add(1, Ordering::SeqCst);
            },
            move |_: &FetchError, _: &AssetIdentity| {
                f.fetch_add(1, Ordering::SeqCst);
            },
        );

        let identity = AssetIdentity::new("http://host/a.png");
        sink.on_success(Arc::new(DynamicImage::new_rgba8(1, 1)), &identity);
        sink.on_failure(&DecodeError::new("bad").into(), &identity);
        sink.on_failure(&DecodeError::new("bad").into(), &identity);

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(failures.load(Ordering::SeqCst), 2);
    }
}
