use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use svcproxy_common::transport::{Codec, HeaderLayout};
use svcproxy_common::{Result, RpcError};
use svcproxy_server::{handle_frame, ServiceFactory};

use crate::config::ZmqServerConfig;
use crate::socket::{self, transport};
use crate::worker::LoopSet;

const SEND_POLL: Duration = Duration::from_millis(100);

/// A reply addressed to the client identity it answers.
struct Routed {
    caller: Vec<u8>,
    frame: Vec<u8>,
}

/// Server binding for a broker-routed ZeroMQ deployment.
///
/// Any number of servers may connect to the same broker; the broker's
/// DEALER spreads requests across them. Each request is dispatched as its
/// own task on the tokio runtime, so a slow operation never holds up the
/// others.
pub struct ZmqServer {
    context: zmq::Context,
    config: ZmqServerConfig,
    factory: Arc<ServiceFactory>,
    loops: Mutex<Option<LoopSet>>,
}

impl ZmqServer {
    pub fn new(context: &zmq::Context, config: ZmqServerConfig, factory: Arc<ServiceFactory>) -> Self {
        ZmqServer {
            context: context.clone(),
            config,
            factory,
            loops: Mutex::new(None),
        }
    }

    /// Connects to the broker and starts serving.
    ///
    /// Must be called from within a tokio runtime, which runs the
    /// dispatched operations. Calling it again while listening is a no-op.
    ///
    /// # Errors
    ///
    /// - `Runtime` outside a tokio runtime
    /// - `Transport` if a socket cannot be created or connected
    pub fn listen(&self) -> Result<()> {
        let mut loops = self.loops.lock();
        if loops.is_some() {
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|e| RpcError::Runtime(e.to_string()))?;

        let inbound = socket::open(&self.context, zmq::DEALER, self.config.receive_timeout)?;
        inbound.connect(&self.config.inbound_address).map_err(transport)?;
        let outbound = socket::open(&self.context, zmq::DEALER, self.config.receive_timeout)?;
        outbound.connect(&self.config.outbound_address).map_err(transport)?;

        let (replies, queue) = mpsc::channel();
        let mut set = LoopSet::new();

        let running = set.running();
        set.spawn("svcproxy-zmq-reply", move || reply_loop(outbound, queue, running))?;

        let running = set.running();
        let factory = Arc::clone(&self.factory);
        let codec = self.config.codec;
        set.spawn("svcproxy-zmq-serve", move || {
            serve_loop(inbound, running, replies, factory, runtime, codec)
        })?;

        *loops = Some(set);
        tracing::info!(
            inbound = %self.config.inbound_address,
            outbound = %self.config.outbound_address,
            services = ?self.factory.services(),
            "zmq server listening"
        );
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.loops.lock().as_ref().is_some_and(LoopSet::is_running)
    }

    /// Stops serving. Requests already dispatched finish, but their replies are dropped.
    pub fn shutdown(&self) {
        if let Some(mut loops) = self.loops.lock().take() {
            loops.stop_and_join();
            tracing::info!("zmq server shut down");
        }
    }
}

impl Drop for ZmqServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve_loop(
    inbound: zmq::Socket,
    running: Arc<AtomicBool>,
    replies: Sender<Routed>,
    factory: Arc<ServiceFactory>,
    runtime: Handle,
    codec: Codec,
) {
    while running.load(Ordering::Acquire) {
        let mut frames = match inbound.recv_multipart(0) {
            Ok(frames) => frames,
            Err(zmq::Error::EAGAIN) => continue,
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to receive request");
                continue;
            }
        };

        // [caller identity, request frame]
        if frames.len() != 2 {
            tracing::warn!(parts = frames.len(), "dropping request with unexpected envelope");
            continue;
        }
        let (Some(frame), Some(caller)) = (frames.pop(), frames.pop()) else {
            continue;
        };

        let factory = Arc::clone(&factory);
        let replies = replies.clone();
        runtime.spawn(async move {
            if let Some(reply) = handle_frame(&factory, &frame, HeaderLayout::Routed, codec).await {
                let routed = Routed {
                    caller,
                    frame: reply.frame.to_vec(),
                };
                if replies.send(routed).is_err() {
                    tracing::debug!(correlation_id = %reply.correlation_id, "server stopped before reply");
                }
            }
        });
    }
    tracing::debug!("zmq serve loop stopped");
}

fn reply_loop(outbound: zmq::Socket, queue: Receiver<Routed>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        let routed = match queue.recv_timeout(SEND_POLL) {
            Ok(routed) => routed,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let parts = [routed.caller.as_slice(), routed.frame.as_slice()];
        if let Err(e) = socket::send_parts(&outbound, &parts, &running) {
            tracing::warn!(error = %e, "failed to send reply");
        }
    }
    tracing::debug!("zmq reply loop stopped");
}
