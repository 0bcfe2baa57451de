//! Latest-wins stream throttling

use futures::Stream;
use futures::ready;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait to add throttling to any Stream
pub trait ThrottleExt: Stream {
    /// Emit at most once per `period`.
    ///
    /// Items arriving within one period collapse into the latest one. The
    /// first item passes immediately; an item still held when the inner
    /// stream ends is emitted before the end.
    fn throttle(self, period: Duration) -> Throttle<Self>
    where
        Self: Sized,
    {
        Throttle::new(self, period)
    }
}

impl<T: Stream> ThrottleExt for T {}

pin_project! {
    /// Stream returned by [`ThrottleExt::throttle`].
    pub struct Throttle<S: Stream> {
        #[pin]
        stream: S,
        interval: Interval,
        pending: Option<S::Item>,
        finished: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        // tokio intervals reject a zero period
        let mut interval = interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self { stream, interval, pending: None, finished: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Keep only the newest of what is ready
        while !*this.finished {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.finished = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.finished { Poll::Ready(None) } else { Poll::Pending };
        }

        ready!(this.interval.poll_tick(cx));
        Poll::Ready(this.pending.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::watch;
    use tokio_stream::wrappers::WatchStream;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_latest() {
        let items: Vec<u32> = tokio_stream::iter(0..10).throttle(Duration::from_millis(100)).collect().await;
        assert_eq!(items, vec![9]);
    }

    #[tokio::test(start_paused = true)]
    async fn updates_are_spaced_by_period() {
        let (tx, rx) = watch::channel(0u32);
        let mut throttled = WatchStream::new(rx).throttle(Duration::from_millis(100));

        let first_at = tokio::time::Instant::now();
        assert_eq!(throttled.next().await, Some(0));

        tx.send_replace(1);
        tx.send_replace(2);
        assert_eq!(throttled.next().await, Some(2));
        assert!(first_at.elapsed() >= Duration::from_millis(100));

        drop(tx);
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_inner_stream_does_not_end_throttle() {
        let (tx, rx) = watch::channel(0u32);
        let mut throttled = WatchStream::from_changes(rx).throttle(Duration::from_millis(10));

        let next = tokio::time::timeout(Duration::from_millis(50), throttled.next()).await;
        assert!(next.is_err(), "nothing was sent, the stream must stay open");

        tx.send_replace(7);
        assert_eq!(throttled.next().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_passes_everything_through() {
        let items: Vec<u32> = tokio_stream::iter(0..3)
            .then(|i| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                i
            })
            .throttle(Duration::ZERO)
            .collect()
            .await;
        assert_eq!(items, vec![0, 1, 2]);
    }
}
