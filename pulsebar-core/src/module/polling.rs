//! Reactive Polling Module
//!
//! A polling module keeps one piece of external state fresh and publishes
//! its rendering to an output cell.
//!
//! # Lifecycle
//!
//! 1. `Initializing`: one fetch populates the state and the first output is
//!    published.
//!
//! 2. `Steady`: the loop waits on three sources at once:
//!    - a scheduler tick, which re-fetches;
//!    - an explicit refresh request, which re-fetches;
//!    - a render-function change, which re-renders the stored state without
//!      fetching.
//!
//! Every fetch is followed by an unconditional publish, even when the state
//! did not change. Fetch, render and publish never suspend the output cell:
//! readers see the previous output for as long as a slow fetch takes.
//!
//! A click is an explicit two-step protocol: [`PollingModule::invoke`] runs
//! the action, then [`PollingModule::request_refresh`] asks the loop to
//! re-fetch. [`PollingModule::click`] does both, refreshing regardless of
//! what the action did.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use super::source::{ActionTrigger, StateFetcher};
use crate::reactive::BroadcastCell;
use crate::timing::Scheduler;

/// A swappable mapping from state to display representation.
pub type RenderFn<S, D> = Arc<dyn Fn(&S) -> D + Send + Sync>;

/// Where a module is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Not yet running, or running its first fetch.
    #[default]
    Initializing,

    /// Initial output published; serving ticks, refreshes and render swaps.
    Steady,
}

enum Event {
    Tick,
    Refresh,
    RenderChanged,
}

struct Inner<F: StateFetcher, A, D> {
    name: String,
    fetcher: F,
    action: A,
    state: BroadcastCell<F::State>,
    render: BroadcastCell<RenderFn<F::State, D>>,
    output: BroadcastCell<D>,
    phase: BroadcastCell<Phase>,
    scheduler: Scheduler,
    refresh: BroadcastCell<()>,
    running: AtomicBool,
}

/// A module that polls a [`StateFetcher`] and publishes rendered output.
///
/// Cloning yields another handle to the same module.
///
/// # Example
///
/// ```rust,ignore
/// let module = PollingModule::new("coffee", fetcher, action, |s: &State| render(s))
///     .every(Duration::from_secs(5));
/// let output = module.output();
/// module.spawn();
///
/// let mut changes = output.subscribe();
/// while changes.changed().await {
///     draw(output.get());
/// }
/// ```
pub struct PollingModule<F: StateFetcher, A, D> {
    inner: Arc<Inner<F, A, D>>,
}

impl<F, A, D> PollingModule<F, A, D>
where
    F: StateFetcher,
    F::State: Default,
    A: ActionTrigger,
    D: Clone + Send + Sync + 'static,
{
    /// Create a module. It does nothing until [`run`](Self::run) or
    /// [`spawn`](Self::spawn) is called.
    ///
    /// The output cell starts out as the rendering of the default state.
    pub fn new<R>(name: impl Into<String>, fetcher: F, action: A, render: R) -> Self
    where
        R: Fn(&F::State) -> D + Send + Sync + 'static,
    {
        let state = F::State::default();
        let render: RenderFn<F::State, D> = Arc::new(render);
        let output = BroadcastCell::new(render(&state));

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                fetcher,
                action,
                state: BroadcastCell::new(state),
                render: BroadcastCell::new(render),
                output,
                phase: BroadcastCell::default(),
                scheduler: Scheduler::new(),
                refresh: BroadcastCell::default(),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Set the refresh interval. Takes effect on the next tick computation
    /// if the module is already running.
    pub fn every(self, interval: Duration) -> Self {
        self.inner.scheduler.every(interval);
        self
    }

    /// Change the refresh interval of a module that may already be running.
    pub fn set_interval(&self, interval: Duration) {
        self.inner.scheduler.every(interval);
    }

    /// Replace the render function. The running loop re-renders the stored
    /// state with it without fetching.
    pub fn set_render<R>(&self, render: R)
    where
        R: Fn(&F::State) -> D + Send + Sync + 'static,
    {
        self.inner.render.set(Arc::new(render));
    }

    /// Handle to the output cell, for the host to read and subscribe to.
    pub fn output(&self) -> BroadcastCell<D> {
        self.inner.output.clone()
    }

    /// Most recently fetched state.
    pub fn state(&self) -> F::State {
        self.inner.state.get()
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Run the action trigger. Its outcome is not reported.
    pub async fn invoke(&self) {
        debug!(module = %self.inner.name, "invoking action");
        self.inner.action.invoke().await;
    }

    /// Ask the loop for an out-of-cycle fetch. Requests made while one is
    /// already pending collapse into it.
    pub fn request_refresh(&self) {
        self.inner.refresh.set(());
    }

    /// Handle a click: invoke the action, then always request a refresh.
    pub async fn click(&self) {
        self.invoke().await;
        self.request_refresh();
    }

    /// Spawn the module loop on the current tokio runtime.
    ///
    /// Aborting the returned handle stops the module and releases its
    /// subscriptions.
    pub fn spawn(&self) -> JoinHandle<()> {
        let module = self.clone();
        let span = info_span!("module", name = %self.inner.name);
        tokio::spawn(async move { module.run().await }.instrument(span))
    }

    /// Run the module loop on the current task. Only returns if the module
    /// is already running elsewhere.
    pub async fn run(&self) {
        let inner = &self.inner;
        if inner.running.swap(true, Ordering::AcqRel) {
            warn!(module = %inner.name, "module is already running");
            return;
        }
        let _running = RunningGuard(&inner.running);

        // Subscribe before the first fetch so a swap or refresh racing
        // with initialization is not missed.
        let mut render_changes = inner.render.subscribe();
        let mut refresh_requests = inner.refresh.subscribe();
        let mut ticker = inner.scheduler.ticker();

        info!(module = %inner.name, interval = ?inner.scheduler.interval(), "module starting");
        inner.refresh_state().await;
        inner.phase.set(Phase::Steady);

        loop {
            let event = tokio::select! {
                _ = ticker.tick() => Event::Tick,
                true = refresh_requests.changed() => Event::Refresh,
                true = render_changes.changed() => Event::RenderChanged,
            };

            match event {
                Event::Tick | Event::Refresh => inner.refresh_state().await,
                Event::RenderChanged => {
                    trace!(module = %inner.name, "render function changed");
                    inner.publish(&inner.state.get());
                }
            }
        }
    }
}

impl<F, A, D> Inner<F, A, D>
where
    F: StateFetcher,
    D: Clone + Send + Sync + 'static,
{
    async fn refresh_state(&self) {
        let state = self.fetcher.fetch().await;
        self.state.set(state.clone());
        self.publish(&state);
    }

    fn publish(&self, state: &F::State) {
        let render = self.render.get();
        let generation = self.output.set(render(state));
        trace!(module = %self.name, generation, "output published");
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<F: StateFetcher, A, D> Clone for PollingModule<F, A, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: StateFetcher, A, D> fmt::Debug for PollingModule<F, A, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollingModule")
            .field("name", &self.inner.name)
            .field("phase", &self.inner.phase.get())
            .field("interval", &self.inner.scheduler.interval())
            .field("output_generation", &self.inner.output.generation())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{FnFetcher, NoAction};
    use std::sync::atomic::AtomicUsize;

    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
    ) -> impl StateFetcher<State = usize> {
        FnFetcher::new(move || {
            let calls = calls.clone();
            async move { calls.fetch_add(1, Ordering::SeqCst) + 1 }
        })
    }

    #[test]
    fn output_starts_as_rendered_default() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new("m", counting_fetcher(calls), NoAction, |s: &usize| {
            format!("n={s}")
        });

        assert_eq!(module.output().get(), "n=0");
        assert_eq!(module.phase(), Phase::Initializing);
    }

    #[test]
    fn debug_reports_name_and_generation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new("m", counting_fetcher(calls), NoAction, |s: &usize| *s);

        let debug = format!("{module:?}");
        assert!(debug.contains(r#"name: "m""#), "{debug}");
        assert!(debug.contains("output_generation: 0"), "{debug}");
    }

    #[tokio::test(start_paused = true)]
    async fn swapping_render_rerenders_without_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new(
            "m",
            counting_fetcher(calls.clone()),
            NoAction,
            |s: &usize| format!("old {s}"),
        );
        let output = module.output();
        let mut changes = output.subscribe();
        let _task = module.spawn();

        assert!(changes.changed().await);
        assert_eq!(output.get(), "old 1");

        module.set_render(|s: &usize| format!("new {s}"));
        assert!(changes.changed().await);
        assert_eq!(output.get(), "new 1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_requests_collapse() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new("m", counting_fetcher(calls.clone()), NoAction, |s: &usize| *s);
        let output = module.output();
        let mut changes = output.subscribe();
        let _task = module.spawn();

        assert!(changes.changed().await);
        assert_eq!(module.phase(), Phase::Steady);

        module.request_refresh();
        module.request_refresh();
        module.request_refresh();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(output.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_returns_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new("m", counting_fetcher(calls), NoAction, |s: &usize| *s);
        let mut changes = module.output().subscribe();
        let _task = module.spawn();
        assert!(changes.changed().await);

        // The spawned loop holds the module, so this returns at once.
        tokio::time::timeout(Duration::from_secs(1), module.run())
            .await
            .expect("second run should not block");
    }

    #[tokio::test(start_paused = true)]
    async fn aborting_releases_render_subscription() {
        let calls = Arc::new(AtomicUsize::new(0));
        let module = PollingModule::new("m", counting_fetcher(calls), NoAction, |s: &usize| *s);
        let mut changes = module.output().subscribe();
        let task = module.spawn();
        assert!(changes.changed().await);
        assert_eq!(module.inner.render.subscriber_count(), 1);
        assert_eq!(module.inner.refresh.subscriber_count(), 1);

        task.abort();
        let _ = task.await;
        assert_eq!(module.inner.render.subscriber_count(), 0);
        assert_eq!(module.inner.refresh.subscriber_count(), 0);
    }
}
