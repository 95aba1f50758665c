//! Rate-limited sampling of status streams

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to sample any stream at a fixed maximum rate
pub trait SampleExt: Stream {
    /// Yield at most once per `period`, keeping only the latest item
    ///
    /// The first item is yielded as soon as it arrives. Periods with no new
    /// item yield nothing. When the inner stream ends, a pending item is
    /// flushed before the sampled stream ends.
    fn sample_every(self, period: Duration) -> Sampled<Self>
    where
        Self: Sized,
    {
        Sampled::new(self, period)
    }
}

impl<T: Stream> SampleExt for T {}

pin_project! {
    /// Stream combinator returned by [`SampleExt::sample_every`]
    pub struct Sampled<S: Stream> {
        #[pin]
        inner: S,
        ticker: Interval,
        latest: Option<S::Item>,
        finished: bool,
    }
}

impl<S: Stream> Sampled<S> {
    pub fn new(inner: S, period: Duration) -> Self {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { inner, ticker, latest: None, finished: false }
    }
}

impl<S: Stream> Stream for Sampled<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.finished {
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.latest = Some(item),
                Poll::Ready(None) => *this.finished = true,
                Poll::Pending => break,
            }
        }

        if *this.finished {
            return Poll::Ready(this.latest.take());
        }
        if this.latest.is_none() {
            return Poll::Pending;
        }

        ready!(this.ticker.poll_tick(cx));
        Poll::Ready(this.latest.take())
    }
}
