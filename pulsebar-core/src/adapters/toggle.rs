//! Generic toggle module built from closures.

use std::future::Future;
use std::time::Duration;

use crate::module::{FnAction, FnFetcher, PollingModule};
use crate::output::Output;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

pub type ToggleModule<FF, FA> = PollingModule<FnFetcher<FF>, FnAction<FA>, Output>;

/// Build a toggle module: `fetch` reads the current state, `click` flips it
/// and `render` draws it. The module re-fetches every five seconds and
/// after every click.
pub fn toggle<FF, FutF, S, FA, FutA, R>(
    name: impl Into<String>,
    fetch: FF,
    click: FA,
    render: R,
) -> ToggleModule<FF, FA>
where
    FF: Fn() -> FutF + Send + Sync + 'static,
    FutF: Future<Output = S> + Send,
    S: Clone + Default + Send + Sync + 'static,
    FA: Fn() -> FutA + Send + Sync + 'static,
    FutA: Future<Output = ()> + Send,
    R: Fn(&S) -> Output + Send + Sync + 'static,
{
    PollingModule::new(name, FnFetcher::new(fetch), FnAction::new(click), render)
        .every(DEFAULT_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Segment;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn click_flips_and_refreshes() {
        let on = Arc::new(AtomicBool::new(false));

        let read = on.clone();
        let flip = on.clone();
        let module = toggle(
            "lamp",
            move || {
                let on = read.clone();
                async move { on.load(Ordering::SeqCst) }
            },
            move || {
                let on = flip.clone();
                async move {
                    on.fetch_xor(true, Ordering::SeqCst);
                }
            },
            |on: &bool| Output::from(Segment::text(if *on { "on" } else { "off" })),
        );

        let output = module.output();
        let mut changes = output.subscribe();
        let _task = module.spawn();

        assert!(changes.changed().await);
        assert_eq!(output.get().segments()[0].text, "off");

        module.click().await;
        assert!(changes.changed().await);
        assert_eq!(output.get().segments()[0].text, "on");
        assert!(module.state());
    }
}
