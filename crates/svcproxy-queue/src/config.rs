use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use std::time::Duration;

use svcproxy_common::transport::Codec;

/// Redis connection settings.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Server host name or address
    /// Default: "127.0.0.1"
    pub host: String,
    /// Server port
    /// Default: 6379
    pub port: u16,
    /// Password for `AUTH`, if the server requires one
    pub password: Option<String>,
}

impl RedisConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        RedisConfig {
            host: host.into(),
            port,
            password: None,
        }
    }

    /// Connection parameters for the redis client.
    ///
    /// The password is passed as-is rather than embedded in a URL, so it may
    /// contain any character.
    pub fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        RedisConfig::new("127.0.0.1", 6379)
    }
}

/// Back-off applied by receive loops while their queue is empty.
///
/// The delay starts at `initial_delay_ms` after the first empty poll, grows
/// by `multiplier` on each further one up to `max_delay_ms`, and resets as
/// soon as an item arrives.
#[derive(Debug, Clone)]
pub struct PollBackoff {
    /// Delay after the first empty poll; values below 1ms are raised to 1ms
    ///
    /// Default: 1ms
    pub initial_delay_ms: u64,
    /// Upper bound for the delay
    ///
    /// Default: 100ms
    pub max_delay_ms: u64,
    /// Growth factor between consecutive empty polls
    ///
    /// Default: 2.0
    pub multiplier: f64,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1,
            max_delay_ms: 100,
            multiplier: 2.0,
        }
    }
}

impl PollBackoff {
    pub fn initial(&self) -> Duration {
        Duration::from_millis(self.floor_ms().min(self.ceiling_ms()))
    }

    /// The delay following `current`. Never zero.
    pub fn next(&self, current: Duration) -> Duration {
        let grown = current.as_millis() as f64 * self.multiplier;
        let capped = grown
            .max(self.floor_ms() as f64)
            .min(self.ceiling_ms() as f64);
        Duration::from_millis(capped as u64)
    }

    fn floor_ms(&self) -> u64 {
        self.initial_delay_ms.max(1)
    }

    fn ceiling_ms(&self) -> u64 {
        self.max_delay_ms.max(1)
    }
}

/// Configuration of a [`QueueClient`](crate::QueueClient).
#[derive(Debug, Clone)]
pub struct QueueClientConfig {
    /// Queue requests are pushed to; the servers' queue
    pub send_queue: String,
    /// Queue this client reads its replies from
    ///
    /// Must be unique per client and must not contain `:`.
    /// Default: `svcproxy-replies-<uuid>`
    pub receive_queue: String,
    /// Payload codec; must match the servers'
    /// Default: JSON
    pub codec: Codec,
    /// Receive loop back-off
    pub backoff: PollBackoff,
}

impl QueueClientConfig {
    /// Client of `send_queue` with a fresh private reply queue.
    pub fn new(send_queue: impl Into<String>) -> Self {
        QueueClientConfig {
            send_queue: send_queue.into(),
            receive_queue: format!("svcproxy-replies-{}", uuid::Uuid::new_v4().simple()),
            codec: Codec::default(),
            backoff: PollBackoff::default(),
        }
    }
}

/// Configuration of a [`QueueServer`](crate::QueueServer).
#[derive(Debug, Clone)]
pub struct QueueServerConfig {
    /// Queue requests are read from
    pub queue: String,
    /// Payload codec; must match the clients'
    /// Default: JSON
    pub codec: Codec,
    /// Receive loop back-off
    pub backoff: PollBackoff,
}

impl QueueServerConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        QueueServerConfig {
            queue: queue.into(),
            codec: Codec::default(),
            backoff: PollBackoff::default(),
        }
    }
}
