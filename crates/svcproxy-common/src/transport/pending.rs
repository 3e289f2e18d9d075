use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::protocol::{ResponseData, Result, RpcError};
use crate::transport::codec::Codec;
use crate::transport::frame::split_frame;

type Completion = oneshot::Sender<Result<ResponseData>>;

/// In-flight requests of one client, keyed by correlation id.
///
/// The owning client inserts a slot before sending and the receive path
/// removes it when the response arrives. Cancellation and dropping the
/// [`PendingResponse`] remove it too, so an abandoned call never leaks its
/// slot. Ids come from a per-table counter and are never reused.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use svcproxy_common::transport::PendingRequests;
/// use svcproxy_common::protocol::ResponseData;
/// use tokio_util::sync::CancellationToken;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let pending = Arc::new(PendingRequests::new());
/// let id = pending.next_id();
/// let waiter = pending.register(id.clone());
///
/// assert!(pending.complete(&id, ResponseData::data(json!(3))));
/// let response = waiter.wait(&CancellationToken::new()).await.unwrap();
/// assert_eq!(response, ResponseData::data(json!(3)));
/// assert!(pending.is_empty());
/// # }
/// ```
#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: AtomicU64,
    slots: DashMap<String, Completion>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next correlation id.
    pub fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    /// Inserts a slot for `id` and returns the guard that waits on it.
    pub fn register(self: &Arc<Self>, id: String) -> PendingResponse {
        let (tx, rx) = oneshot::channel();
        if self.slots.insert(id.clone(), tx).is_some() {
            tracing::warn!(correlation_id = %id, "replaced an in-flight request slot");
        }

        PendingResponse {
            id,
            rx,
            table: Arc::clone(self),
        }
    }

    /// Resolves the slot for `id` with a response.
    ///
    /// Returns `false` when no slot exists (already completed, cancelled or
    /// timed out); the response is dropped.
    pub fn complete(&self, id: &str, response: ResponseData) -> bool {
        self.settle(id, Ok(response))
    }

    /// Resolves a slot from a raw response frame.
    ///
    /// A frame whose header cannot be read is dropped; one whose payload
    /// does not decode fails its request with the codec error.
    pub fn complete_frame(&self, frame: &[u8], codec: Codec) -> bool {
        let (id, payload) = match split_frame(frame) {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed response frame");
                return false;
            }
        };

        match codec.decode_response(payload) {
            Ok(response) => self.complete(id, response),
            Err(e) => self.fail(id, RpcError::InvalidResponse(e.to_string())),
        }
    }

    /// Resolves the slot for `id` with an error.
    pub fn fail(&self, id: &str, error: RpcError) -> bool {
        self.settle(id, Err(error))
    }

    /// Removes the slot for `id` without resolving it.
    pub fn discard(&self, id: &str) -> bool {
        self.slots.remove(id).is_some()
    }

    /// Fails every in-flight request, used when the owning client stops.
    pub fn abandon_all(&self) {
        let ids: Vec<String> = self.slots.iter().map(|slot| slot.key().clone()).collect();
        for id in ids {
            self.fail(&id, RpcError::ShutDown);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn settle(&self, id: &str, outcome: Result<ResponseData>) -> bool {
        match self.slots.remove(id) {
            Some((_, tx)) => {
                // The receiver may already be gone if the caller stopped waiting.
                let _ = tx.send(outcome);
                true
            }
            None => {
                tracing::debug!(correlation_id = %id, "dropping response for unknown request");
                false
            }
        }
    }
}

/// Waiter for one registered request.
///
/// Dropping it before the response arrives discards the slot.
#[derive(Debug)]
pub struct PendingResponse {
    id: String,
    rx: oneshot::Receiver<Result<ResponseData>>,
    table: Arc<PendingRequests>,
}

impl PendingResponse {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the response or for `cancel`, whichever comes first.
    pub async fn wait(mut self, cancel: &CancellationToken) -> Result<ResponseData> {
        tokio::select! {
            biased;
            outcome = &mut self.rx => {
                outcome.unwrap_or_else(|_| Err(RpcError::Transport("request slot closed".to_string())))
            }
            _ = cancel.cancelled() => {
                self.table.discard(&self.id);
                tracing::debug!(correlation_id = %self.id, "request cancelled");
                Err(RpcError::Cancelled)
            }
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.table.discard(&self.id);
    }
}
