use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::{Client, Codec, PendingRequests, RequestFrame};
use svcproxy_common::{RequestData, ResponseData, Result, RpcError};

use crate::config::ZmqClientConfig;
use crate::socket::{self, transport};
use crate::worker::LoopSet;

/// How long the send loop waits on its queue before re-checking shutdown.
const SEND_POLL: Duration = Duration::from_millis(100);

/// An encoded request waiting for the send loop.
struct Outgoing {
    correlation_id: String,
    frame: Vec<u8>,
}

/// Sockets and queue handed to the loops when they start.
struct Idle {
    inbound: zmq::Socket,
    outbound: zmq::Socket,
    queue: Receiver<Outgoing>,
}

/// Client binding for a broker-routed ZeroMQ deployment.
///
/// # Architecture
///
/// - **Sockets**: two DEALERs sharing one random identity; requests leave on
///   the outbound one, the broker routes replies back to the inbound one by
///   that identity
/// - **Send loop**: a thread draining the request queue, so callers never
///   touch a (non thread-safe) socket
/// - **Receive loop**: a thread polling the inbound socket; each reply is
///   matched to its caller on the tokio runtime
///
/// Both loops start on the first request and stop on [`shutdown`](Self::shutdown)
/// or drop; requests still in flight then fail with `ShutDown`.
pub struct ZmqClient {
    config: ZmqClientConfig,
    pending: Arc<PendingRequests>,
    queue: Sender<Outgoing>,
    idle: Mutex<Option<Idle>>,
    loops: Mutex<Option<LoopSet>>,
    started: AtomicBool,
    shut_down: AtomicBool,
}

impl ZmqClient {
    /// Creates the client and connects both sockets.
    ///
    /// No thread is started until the first request.
    pub fn new(context: &zmq::Context, config: ZmqClientConfig) -> Result<Self> {
        let identity = socket::new_identity();

        let inbound = socket::open(context, zmq::DEALER, config.receive_timeout)?;
        inbound.set_identity(&identity).map_err(transport)?;
        inbound.connect(&config.inbound_address).map_err(transport)?;

        let outbound = socket::open(context, zmq::DEALER, config.receive_timeout)?;
        outbound.set_identity(&identity).map_err(transport)?;
        outbound.connect(&config.outbound_address).map_err(transport)?;

        let (queue, receiver) = mpsc::channel();
        tracing::debug!(
            inbound = %config.inbound_address,
            outbound = %config.outbound_address,
            "zmq client connected"
        );

        Ok(ZmqClient {
            config,
            pending: Arc::new(PendingRequests::new()),
            queue,
            idle: Mutex::new(Some(Idle {
                inbound,
                outbound,
                queue: receiver,
            })),
            loops: Mutex::new(None),
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn codec(&self) -> Codec {
        self.config.codec
    }

    /// Number of requests waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Stops both loops and fails every request still in flight.
    ///
    /// Blocks for up to one receive timeout while the loops notice.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut loops) = self.loops.lock().take() {
            loops.stop_and_join();
        }
        self.idle.lock().take();
        self.pending.abandon_all();
        tracing::info!("zmq client shut down");
    }

    fn ensure_started(&self) -> Result<()> {
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut loops = self.loops.lock();
        if loops.is_some() {
            return Ok(());
        }
        if self.shut_down.load(Ordering::Acquire) {
            return Err(RpcError::ShutDown);
        }

        let runtime = Handle::try_current().map_err(|e| RpcError::Runtime(e.to_string()))?;
        let Idle {
            inbound,
            outbound,
            queue,
        } = self.idle.lock().take().ok_or(RpcError::ShutDown)?;

        let mut set = LoopSet::new();

        let running = set.running();
        let pending = Arc::clone(&self.pending);
        set.spawn("svcproxy-zmq-send", move || {
            send_loop(outbound, queue, running, pending)
        })?;

        let running = set.running();
        let pending = Arc::clone(&self.pending);
        let codec = self.config.codec;
        set.spawn("svcproxy-zmq-receive", move || {
            receive_loop(inbound, running, pending, runtime, codec)
        })?;

        *loops = Some(set);
        self.started.store(true, Ordering::Release);
        tracing::info!("zmq client loops started");
        Ok(())
    }
}

#[async_trait]
impl Client for ZmqClient {
    async fn request(&self, request: RequestData, cancel: CancellationToken) -> Result<ResponseData> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(RpcError::ShutDown);
        }
        self.ensure_started()?;

        let correlation_id = self.pending.next_id();
        let frame = RequestFrame {
            reply_to: None,
            correlation_id: correlation_id.clone(),
            request,
        }
        .encode(self.config.codec)?;

        let waiter = self.pending.register(correlation_id.clone());
        self.queue
            .send(Outgoing {
                correlation_id,
                frame: frame.to_vec(),
            })
            .map_err(|_| RpcError::ShutDown)?;

        waiter.wait(&cancel).await
    }
}

impl Drop for ZmqClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send_loop(
    outbound: zmq::Socket,
    queue: Receiver<Outgoing>,
    running: Arc<AtomicBool>,
    pending: Arc<PendingRequests>,
) {
    while running.load(Ordering::Acquire) {
        let outgoing = match queue.recv_timeout(SEND_POLL) {
            Ok(outgoing) => outgoing,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Err(e) = socket::send_parts(&outbound, &[outgoing.frame.as_slice()], &running) {
            tracing::warn!(correlation_id = %outgoing.correlation_id, error = %e, "failed to send request");
            pending.fail(&outgoing.correlation_id, transport(e));
        }
    }
    tracing::debug!("zmq send loop stopped");
}

fn receive_loop(
    inbound: zmq::Socket,
    running: Arc<AtomicBool>,
    pending: Arc<PendingRequests>,
    runtime: Handle,
    codec: Codec,
) {
    while running.load(Ordering::Acquire) {
        let frames = match inbound.recv_multipart(0) {
            Ok(frames) => frames,
            Err(zmq::Error::EAGAIN) => continue,
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to receive reply");
                continue;
            }
        };

        // The broker strips the routing identity; the reply is the last part.
        let Some(frame) = frames.into_iter().last() else {
            continue;
        };

        let pending = Arc::clone(&pending);
        runtime.spawn(async move {
            pending.complete_frame(&frame, codec);
        });
    }
    tracing::debug!("zmq receive loop stopped");
}
