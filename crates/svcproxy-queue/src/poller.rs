use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::PollBackoff;
use crate::store::ListStore;

/// Pops items from `queue` until `cancel` fires, handing each to `on_item`.
///
/// An empty queue or a store error is followed by a back-off pause; the
/// pause grows while the queue stays empty and resets on the next item.
/// Store errors are logged and retried, never fatal.
pub(crate) async fn poll_queue<S, F>(
    store: &S,
    queue: &str,
    backoff: &PollBackoff,
    cancel: &CancellationToken,
    mut on_item: F,
) where
    S: ListStore + ?Sized,
    F: FnMut(Vec<u8>),
{
    let mut delay: Option<Duration> = None;

    loop {
        let popped = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            popped = store.pop_tail(queue) => popped,
        };

        match popped {
            Ok(Some(item)) => {
                delay = None;
                on_item(item);
                continue;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%queue, error = %e, "failed to poll queue"),
        }

        let pause = match delay {
            None => backoff.initial(),
            Some(current) => backoff.next(current),
        };
        delay = Some(pause);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::debug!(%queue, "queue poller stopped");
}
