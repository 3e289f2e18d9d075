use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::{Codec, HeaderLayout};
use svcproxy_common::{Result, RpcError};
use svcproxy_server::{handle_frame, ServiceFactory};

use crate::config::QueueServerConfig;
use crate::poller::poll_queue;
use crate::store::ListStore;

/// Server binding over a shared list store.
///
/// Any number of servers may read the same request queue; each request is
/// popped by exactly one of them. Requests are dispatched concurrently and
/// every reply is pushed onto the queue named in its request header.
pub struct QueueServer {
    store: Arc<dyn ListStore>,
    config: QueueServerConfig,
    factory: Arc<ServiceFactory>,
    cancel: CancellationToken,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl QueueServer {
    pub fn new(store: impl ListStore, config: QueueServerConfig, factory: Arc<ServiceFactory>) -> Self {
        QueueServer {
            store: Arc::new(store),
            config,
            factory,
            cancel: CancellationToken::new(),
            poller: Mutex::new(None),
        }
    }

    /// Starts popping and serving requests.
    ///
    /// Calling it again while listening is a no-op.
    ///
    /// # Errors
    ///
    /// - `Runtime` outside a tokio runtime
    /// - `ShutDown` after [`shutdown`](Self::shutdown)
    pub fn listen(&self) -> Result<()> {
        let mut poller = self.poller.lock();
        if poller.is_some() {
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            return Err(RpcError::ShutDown);
        }

        let runtime = Handle::try_current().map_err(|e| RpcError::Runtime(e.to_string()))?;
        let store = Arc::clone(&self.store);
        let factory = Arc::clone(&self.factory);
        let cancel = self.cancel.clone();
        let config = self.config.clone();

        *poller = Some(runtime.spawn(async move {
            poll_queue(&*store, &config.queue, &config.backoff, &cancel, |frame| {
                tokio::spawn(serve(
                    Arc::clone(&store),
                    Arc::clone(&factory),
                    frame,
                    config.codec,
                ));
            })
            .await
        }));

        tracing::info!(
            queue = %self.config.queue,
            services = ?self.factory.services(),
            "queue server listening"
        );
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.poller.lock().is_some() && !self.cancel.is_cancelled()
    }

    /// Stops popping requests. Requests already popped are still answered.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            if let Err(e) = poller.await {
                tracing::warn!(error = %e, "queue poller failed");
            }
        }
        tracing::info!(queue = %self.config.queue, "queue server shut down");
    }
}

impl Drop for QueueServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn serve(
    store: Arc<dyn ListStore>,
    factory: Arc<ServiceFactory>,
    frame: Vec<u8>,
    codec: Codec,
) {
    let Some(reply) = handle_frame(&factory, &frame, HeaderLayout::Queued, codec).await else {
        return;
    };
    let Some(reply_to) = reply.reply_to else {
        return;
    };

    if let Err(e) = store.push_head(&reply_to, reply.frame.to_vec()).await {
        tracing::warn!(
            correlation_id = %reply.correlation_id,
            queue = %reply_to,
            error = %e,
            "failed to push reply"
        );
    }
}
