//! Rate-limited fan-out/fan-in over an ordered batch of work items.
//!
//! Items are started one per tick of a fixed interval and then run
//! concurrently on the calling task. Results come back in input order. A
//! failure stops further starts and the lowest-index failure is returned.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use futures::future::{self, Join, Ready};
use futures::stream::{FuturesUnordered, StreamExt as _};
use tokio::time::{Interval, MissedTickBehavior};

/// The first item of a batch starts right away, without waiting one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub interval: Duration,
    /// Upper bound on started-but-unfinished items. `None` means unbounded.
    pub max_in_flight: Option<usize>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_in_flight: None,
        }
    }

    pub fn with_max_in_flight(mut self, max_in_flight: Option<usize>) -> Self {
        self.max_in_flight = max_in_flight.map(|max| max.max(1));
        self
    }

    pub async fn run<I, T, R, E, F, Fut>(&self, items: I, producer: F) -> Result<Vec<R>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.run_observed(items, producer, |_, _| {}).await
    }

    /// Like [`Throttle::run`], calling `on_complete` with the input index and
    /// result of every item that succeeds, in completion order.
    ///
    /// Once an item fails nothing new is started. Items started before it are
    /// still awaited so that an earlier item's failure takes precedence; later
    /// items are dropped. `on_complete` is not called after a failure.
    pub async fn run_observed<I, T, R, E, F, Fut, O>(
        &self,
        items: I,
        mut producer: F,
        mut on_complete: O,
    ) -> Result<Vec<R>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        O: FnMut(usize, &R),
    {
        let items = items.into_iter().collect::<Vec<_>>();
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut ticker = Ticker::new(self.interval);
        let mut queued = items.into_iter().enumerate().peekable();
        let mut in_flight: FuturesUnordered<Join<Ready<usize>, Fut>> = FuturesUnordered::new();
        let mut results = std::iter::repeat_with(|| None)
            .take(total)
            .collect::<Vec<Option<R>>>();
        let mut started = BTreeSet::new();
        let mut failure: Option<(usize, E)> = None;
        let mut completed = 0_usize;

        loop {
            match &failure {
                Some((failed, _)) if started.range(..*failed).next().is_none() => break,
                None if completed == total => break,
                _ => {}
            }

            let can_start = failure.is_none()
                && queued.peek().is_some()
                && self.max_in_flight.is_none_or(|max| in_flight.len() < max);

            tokio::select! {
                biased;

                Some((index, outcome)) = in_flight.next(), if !in_flight.is_empty() => {
                    started.remove(&index);
                    match outcome {
                        Ok(value) if failure.is_none() => {
                            on_complete(index, &value);
                            results[index] = Some(value);
                            completed += 1;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            if failure.as_ref().is_none_or(|(failed, _)| index < *failed) {
                                tracing::debug!(index, total, "throttle: item failed");
                                failure = Some((index, err));
                            }
                        }
                    }
                }
                _ = ticker.tick(), if can_start => {
                    if let Some((index, item)) = queued.next() {
                        tracing::trace!(index, total, "throttle: start item");
                        started.insert(index);
                        in_flight.push(future::join(future::ready(index), producer(item)));
                    }
                }
            }
        }

        if let Some((_, err)) = failure {
            return Err(err);
        }
        Ok(results.into_iter().flatten().collect())
    }
}

enum Ticker {
    Immediate,
    Timed(Interval),
}

impl Ticker {
    fn new(period: Duration) -> Self {
        if period.is_zero() {
            return Self::Immediate;
        }
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self::Timed(interval)
    }

    async fn tick(&mut self) {
        match self {
            Self::Immediate => {}
            Self::Timed(interval) => {
                interval.tick().await;
            }
        }
    }
}
