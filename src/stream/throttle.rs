//! Latest-wins stream throttling

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Extension trait adding [`throttle`](ThrottleExt::throttle) to any stream.
pub trait ThrottleExt: Stream {
    /// Emit at most one item per `period`.
    ///
    /// Items arriving within one period replace each other; only the latest
    /// is emitted when the period elapses. The first item passes through
    /// immediately.
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
        exhausted: bool,
    }
}

impl<S: Stream> Throttle<S> {
    pub fn new(stream: S, period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { stream, interval, pending: None, exhausted: false }
    }
}

impl<S: Stream> Stream for Throttle<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        while !*this.exhausted {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => *this.pending = Some(item),
                Poll::Ready(None) => *this.exhausted = true,
                Poll::Pending => break,
            }
        }

        if this.pending.is_none() {
            return if *this.exhausted { Poll::Ready(None) } else { Poll::Pending };
        }

        // Flush the last item of a finished stream without waiting a period.
        if !*this.exhausted && this.interval.poll_tick(cx).is_pending() {
            return Poll::Pending;
        }
        Poll::Ready(this.pending.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    #[tokio::test(start_paused = true)]
    async fn keeps_latest_item_per_period() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(100));

        tx.send(1).unwrap();
        assert_eq!(throttled.next().await, Some(1));

        tx.send(2).unwrap();
        tx.send(3).unwrap();
        tx.send(4).unwrap();
        assert_eq!(throttled.next().await, Some(4));

        drop(tx);
        assert_eq!(throttled.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_source_does_not_end_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut throttled = UnboundedReceiverStream::new(rx).throttle(Duration::from_millis(10));

        let waiting = tokio::time::timeout(Duration::from_millis(50), throttled.next()).await;
        assert!(waiting.is_err(), "stream should stay pending while idle");

        tx.send(7).unwrap();
        assert_eq!(throttled.next().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn finished_stream_flushes_pending_item() {
        let items = futures::stream::iter(vec![1, 2, 3]);
        let collected: Vec<_> = items.throttle(Duration::from_secs(1)).collect().await;
        assert_eq!(collected, vec![3]);
    }
}
