use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use svcproxy_common::Result;

use crate::config::BrokerConfig;
use crate::socket::{self, transport};
use crate::worker::LoopSet;

/// Messages relayed so far, per direction.
#[derive(Debug, Default)]
pub struct BrokerStats {
    requests: AtomicU64,
    replies: AtomicU64,
}

impl BrokerStats {
    /// Requests relayed from clients to servers.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Replies relayed from servers to clients.
    pub fn replies(&self) -> u64 {
        self.replies.load(Ordering::Relaxed)
    }
}

/// Load-balancing relay between clients and servers.
///
/// # Architecture
///
/// ```text
/// client DEALER -> [ROUTER client_outbound] -> [DEALER server_inbound]  -> server DEALERs
/// client DEALER <- [ROUTER client_inbound]  <- [DEALER server_outbound] <- server DEALERs
/// ```
///
/// The client-facing ROUTER prefixes every request with the sender's
/// identity; the frames then travel unchanged through the servers and
/// back, and the reply-side ROUTER uses that first frame to pick the
/// client. The server-facing DEALER hands requests to connected servers in
/// turn. The broker never looks inside a message.
pub struct ZmqBroker {
    context: zmq::Context,
    config: BrokerConfig,
    stats: Arc<BrokerStats>,
    loops: Mutex<Option<LoopSet>>,
}

impl ZmqBroker {
    pub fn new(context: &zmq::Context, config: BrokerConfig) -> Self {
        ZmqBroker {
            context: context.clone(),
            config,
            stats: Arc::new(BrokerStats::default()),
            loops: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn stats(&self) -> &BrokerStats {
        &self.stats
    }

    /// Binds all four sockets and starts relaying.
    ///
    /// Every socket is bound before this returns, so peers may connect as
    /// soon as it does and a bind failure (address in use, bad endpoint)
    /// is reported here. Calling it again while running is a no-op.
    pub fn listen(&self) -> Result<()> {
        let mut loops = self.loops.lock();
        if loops.is_some() {
            return Ok(());
        }

        let timeout = self.config.receive_timeout;
        let bind = |kind: zmq::SocketType, endpoint: &str| -> Result<zmq::Socket> {
            let socket = socket::open(&self.context, kind, timeout)?;
            socket.bind(endpoint).map_err(transport)?;
            Ok(socket)
        };

        let client_outbound = bind(zmq::ROUTER, &self.config.client_outbound)?;
        let server_inbound = bind(zmq::DEALER, &self.config.server_inbound)?;
        let server_outbound = bind(zmq::DEALER, &self.config.server_outbound)?;
        let client_inbound = bind(zmq::ROUTER, &self.config.client_inbound)?;

        let mut set = LoopSet::new();

        let running = set.running();
        let stats = Arc::clone(&self.stats);
        set.spawn("svcproxy-broker-requests", move || {
            relay(&client_outbound, &server_inbound, &running, &stats.requests)
        })?;

        let running = set.running();
        let stats = Arc::clone(&self.stats);
        set.spawn("svcproxy-broker-replies", move || {
            relay(&server_outbound, &client_inbound, &running, &stats.replies)
        })?;

        *loops = Some(set);
        tracing::info!(
            client_inbound = %self.config.client_inbound,
            client_outbound = %self.config.client_outbound,
            server_inbound = %self.config.server_inbound,
            server_outbound = %self.config.server_outbound,
            "broker listening"
        );
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.loops.lock().as_ref().is_some_and(LoopSet::is_running)
    }

    /// Stops relaying and closes the sockets.
    pub fn shutdown(&self) {
        if let Some(mut loops) = self.loops.lock().take() {
            loops.stop_and_join();
            tracing::info!(
                requests = self.stats.requests(),
                replies = self.stats.replies(),
                "broker shut down"
            );
        }
    }
}

impl Drop for ZmqBroker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Forwards every multipart message from `from` to `to`, frames unchanged.
fn relay(from: &zmq::Socket, to: &zmq::Socket, running: &AtomicBool, counter: &AtomicU64) {
    while running.load(Ordering::Acquire) {
        let frames = match from.recv_multipart(0) {
            Ok(frames) => frames,
            Err(zmq::Error::EAGAIN) => continue,
            Err(zmq::Error::ETERM) => break,
            Err(e) => {
                tracing::warn!(error = %e, "broker failed to receive");
                continue;
            }
        };

        let parts: Vec<&[u8]> = frames.iter().map(Vec::as_slice).collect();
        match socket::send_parts(to, &parts, running) {
            Ok(()) => {
                counter.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => tracing::warn!(error = %e, parts = parts.len(), "broker failed to forward"),
        }
    }
    tracing::debug!("broker relay stopped");
}
