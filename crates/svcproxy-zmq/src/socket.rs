//! Socket setup shared by the client, server and broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use svcproxy_common::RpcError;

/// Maps a ZeroMQ error onto the transport error.
pub(crate) fn transport(err: zmq::Error) -> RpcError {
    RpcError::Transport(err.to_string())
}

/// Creates a socket with the options every svcproxy socket uses.
///
/// Pending messages are dropped on close (LINGER 0) and queues are
/// unbounded (high-water marks 0). Sends and receives give up after
/// `receive_timeout` so loops can observe shutdown.
pub(crate) fn open(
    context: &zmq::Context,
    kind: zmq::SocketType,
    receive_timeout: Duration,
) -> Result<zmq::Socket, RpcError> {
    let socket = context.socket(kind).map_err(transport)?;
    socket.set_linger(0).map_err(transport)?;
    socket.set_sndhwm(0).map_err(transport)?;
    socket.set_rcvhwm(0).map_err(transport)?;
    socket.set_rcvtimeo(millis(receive_timeout)).map_err(transport)?;
    socket.set_sndtimeo(millis(receive_timeout)).map_err(transport)?;
    Ok(socket)
}

/// Sends a multipart message, retrying while no peer can take it.
///
/// Gives up with `EAGAIN` once `running` is cleared.
pub(crate) fn send_parts(
    socket: &zmq::Socket,
    parts: &[&[u8]],
    running: &AtomicBool,
) -> Result<(), zmq::Error> {
    loop {
        match socket.send_multipart(parts.iter().copied(), 0) {
            Err(zmq::Error::EAGAIN) if running.load(Ordering::Acquire) => continue,
            other => return other,
        }
    }
}

/// Random routing identity. ZeroMQ reserves identities starting with a zero byte.
pub(crate) fn new_identity() -> Vec<u8> {
    let mut identity = uuid::Uuid::new_v4().as_bytes().to_vec();
    if identity[0] == 0 {
        identity[0] = 1;
    }
    identity
}

pub(crate) fn millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identities_are_routable_and_distinct() {
        let identities: Vec<Vec<u8>> = (0..64).map(|_| new_identity()).collect();
        assert!(identities.iter().all(|id| id.len() == 16 && id[0] != 0));
        assert_ne!(identities[0], identities[1]);
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(100)), 100);
        assert_eq!(millis(Duration::from_secs(u64::MAX / 1000)), i32::MAX);
    }

    #[test]
    fn test_open_applies_options() {
        let context = zmq::Context::new();
        let socket = open(&context, zmq::DEALER, Duration::from_millis(25)).unwrap();
        assert_eq!(socket.get_linger().unwrap(), 0);
        assert_eq!(socket.get_rcvtimeo().unwrap(), 25);
        assert_eq!(socket.get_sndhwm().unwrap(), 0);
    }
}
