//! Bounded-concurrency helpers for test modules.
//!
//! Modules probe many location/payload pairs; these helpers run them with at
//! most `max_concurrent` requests in flight and hand results back in input
//! order so module output is deterministic.

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::debug;

/// Type alias for boxed futures tagged with their input position
type IndexedFuture<'a, T> = Pin<Box<dyn Future<Output = (usize, T)> + Send + 'a>>;

/// Run `op` over every input with bounded concurrency.
///
/// Results are returned in the order of `inputs`, regardless of completion
/// order. A `max_concurrent` of zero is treated as one.
pub async fn map_bounded<'a, I, T, F, Fut>(inputs: Vec<I>, op: F, max_concurrent: usize) -> Vec<T>
where
    I: 'a,
    T: Send + 'a,
    F: Fn(I) -> Fut + 'a,
    Fut: Future<Output = T> + Send + 'a,
{
    if inputs.is_empty() {
        return Vec::new();
    }

    let max_concurrent = max_concurrent.max(1);
    let total = inputs.len();
    debug!("Running {} probes with max {} concurrent", total, max_concurrent);

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut futures: FuturesUnordered<IndexedFuture<'a, T>> = FuturesUnordered::new();
    let mut pending = inputs.into_iter().enumerate();

    let make_future = |index: usize, input: I, f: &F| -> IndexedFuture<'a, T> {
        let fut = f(input);
        Box::pin(async move { (index, fut.await) })
    };

    for (index, input) in pending.by_ref().take(max_concurrent) {
        futures.push(make_future(index, input, &op));
    }

    while let Some((index, output)) = futures.next().await {
        slots[index] = Some(output);

        if let Some((next, input)) = pending.next() {
            futures.push(make_future(next, input, &op));
        }
    }

    slots.into_iter().flatten().collect()
}
