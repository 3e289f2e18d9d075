use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::{Client, PendingRequests, RequestFrame};
use svcproxy_common::{RequestData, ResponseData, Result, RpcError};

use crate::config::QueueClientConfig;
use crate::poller::poll_queue;
use crate::store::ListStore;

/// Client binding over a shared list store.
///
/// Requests are pushed onto the servers' queue with this client's reply
/// queue in the header; a background task pops replies from that queue and
/// completes the matching requests. The task starts with the first request.
pub struct QueueClient {
    store: Arc<dyn ListStore>,
    config: QueueClientConfig,
    pending: Arc<PendingRequests>,
    cancel: CancellationToken,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl QueueClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFrame` if the reply queue name is empty or contains `:`,
    /// which would make request headers ambiguous.
    pub fn new(store: impl ListStore, config: QueueClientConfig) -> Result<Self> {
        if config.receive_queue.is_empty() || config.receive_queue.contains(':') {
            return Err(RpcError::InvalidFrame(format!(
                "invalid reply queue name '{}'",
                config.receive_queue
            )));
        }

        Ok(QueueClient {
            store: Arc::new(store),
            config,
            pending: Arc::new(PendingRequests::new()),
            cancel: CancellationToken::new(),
            receiver: Mutex::new(None),
        })
    }

    pub fn receive_queue(&self) -> &str {
        &self.config.receive_queue
    }

    /// Number of requests waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Stops the receive task and fails every request still in flight.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let receiver = self.receiver.lock().take();
        if let Some(receiver) = receiver {
            if let Err(e) = receiver.await {
                tracing::warn!(error = %e, "queue receive task failed");
            }
        }
        self.pending.abandon_all();
        tracing::info!(queue = %self.config.receive_queue, "queue client shut down");
    }

    fn ensure_started(&self) -> Result<()> {
        let mut receiver = self.receiver.lock();
        if receiver.is_some() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(RpcError::ShutDown);
        }

        let store = Arc::clone(&self.store);
        let pending = Arc::clone(&self.pending);
        let cancel = self.cancel.clone();
        let queue = self.config.receive_queue.clone();
        let backoff = self.config.backoff.clone();
        let codec = self.config.codec;

        *receiver = Some(tokio::spawn(async move {
            poll_queue(&*store, &queue, &backoff, &cancel, |frame| {
                pending.complete_frame(&frame, codec);
            })
            .await
        }));
        tracing::debug!(queue = %self.config.receive_queue, "queue receive task started");
        Ok(())
    }
}

#[async_trait]
impl Client for QueueClient {
    async fn request(&self, request: RequestData, cancel: CancellationToken) -> Result<ResponseData> {
        if self.cancel.is_cancelled() {
            return Err(RpcError::ShutDown);
        }
        self.ensure_started()?;

        let correlation_id = self.pending.next_id();
        let frame = RequestFrame {
            reply_to: Some(self.config.receive_queue.clone()),
            correlation_id: correlation_id.clone(),
            request,
        }
        .encode(self.config.codec)?;

        let waiter = self.pending.register(correlation_id);
        // On failure the waiter is dropped here, which frees its slot.
        self.store
            .push_head(&self.config.send_queue, frame.to_vec())
            .await?;

        waiter.wait(&cancel).await
    }
}

impl Drop for QueueClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.pending.abandon_all();
    }
}
