//! State sources and action triggers.
//!
//! These are the seams between a polling module and the outside world. The
//! module only ever sees infallible [`StateFetcher`]s: a source that can
//! fail implements [`TryFetch`] and is wrapped in [`Degrading`], which logs
//! the failure and substitutes the source's degraded sentinel.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

/// Retrieves the current external state.
///
/// Must not fail. A source that cannot reach its target returns a
/// recognizable degraded value instead.
pub trait StateFetcher: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;

    fn fetch(&self) -> impl Future<Output = Self::State> + Send;
}

/// A state source that may fail.
pub trait TryFetch: Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;
    type Error: Display + Send;

    fn try_fetch(&self) -> impl Future<Output = Result<Self::State, Self::Error>> + Send;

    /// The sentinel published when `try_fetch` fails.
    fn degraded(&self) -> Self::State;
}

/// Adapts a [`TryFetch`] into a [`StateFetcher`] by substituting the
/// degraded state on error.
#[derive(Debug, Clone)]
pub struct Degrading<F> {
    inner: F,
}

impl<F: TryFetch> Degrading<F> {
    pub fn new(inner: F) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: TryFetch> StateFetcher for Degrading<F> {
    type State = F::State;

    async fn fetch(&self) -> Self::State {
        match self.inner.try_fetch().await {
            Ok(state) => state,
            Err(error) => {
                warn!(%error, "fetch failed; publishing degraded state");
                self.inner.degraded()
            }
        }
    }
}

/// Performs a side effect against the external system.
///
/// Fire and forget: the outcome is observed through the next fetch.
pub trait ActionTrigger: Send + Sync + 'static {
    fn invoke(&self) -> impl Future<Output = ()> + Send;
}

/// A module without a click action.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAction;

impl ActionTrigger for NoAction {
    async fn invoke(&self) {}
}

/// [`StateFetcher`] built from an async closure.
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

impl<F> FnFetcher<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut, S> StateFetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = S> + Send,
    S: Clone + Send + Sync + 'static,
{
    type State = S;

    fn fetch(&self) -> impl Future<Output = S> + Send {
        (self.f)()
    }
}

/// [`ActionTrigger`] built from an async closure.
#[derive(Clone)]
pub struct FnAction<F> {
    f: F,
}

impl<F> FnAction<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> ActionTrigger for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    fn invoke(&self) -> impl Future<Output = ()> + Send {
        (self.f)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Arc;

    struct Flaky {
        fail: AtomicBool,
    }

    impl TryFetch for Flaky {
        type State = i32;
        type Error = String;

        async fn try_fetch(&self) -> Result<i32, String> {
            if self.fail.load(Ordering::SeqCst) {
                Err("connection refused".to_string())
            } else {
                Ok(7)
            }
        }

        fn degraded(&self) -> i32 {
            -1
        }
    }

    #[tokio::test]
    async fn degrading_substitutes_sentinel_on_error() {
        let fetcher = Degrading::new(Flaky {
            fail: AtomicBool::new(true),
        });
        assert_eq!(fetcher.fetch().await, -1);

        fetcher.inner().fail.store(false, Ordering::SeqCst);
        assert_eq!(fetcher.fetch().await, 7);
    }

    #[tokio::test]
    async fn closure_shims_forward_calls() {
        let count = Arc::new(AtomicI32::new(0));

        let fetch_count = count.clone();
        let fetcher = FnFetcher::new(move || {
            let count = fetch_count.clone();
            async move { count.load(Ordering::SeqCst) }
        });

        let action_count = count.clone();
        let action = FnAction::new(move || {
            let count = action_count.clone();
            async move {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(fetcher.fetch().await, 0);
        action.invoke().await;
        action.invoke().await;
        assert_eq!(fetcher.fetch().await, 2);

        NoAction.invoke().await;
    }
}
