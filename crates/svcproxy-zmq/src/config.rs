use std::time::Duration;

use svcproxy_common::transport::Codec;

/// Configuration of a [`ZmqClient`](crate::ZmqClient).
///
/// A client talks to the broker's client-facing sockets: it sends on
/// `outbound_address` and receives replies on `inbound_address`.
#[derive(Debug, Clone)]
pub struct ZmqClientConfig {
    /// Broker socket replies are received from
    pub inbound_address: String,
    /// Broker socket requests are sent to
    pub outbound_address: String,
    /// Payload codec; must match the servers'
    /// Default: JSON
    pub codec: Codec,
    /// How long one receive poll blocks before re-checking for shutdown
    ///
    /// Default: 100ms
    pub receive_timeout: Duration,
}

impl Default for ZmqClientConfig {
    fn default() -> Self {
        BrokerConfig::default().client_config()
    }
}

/// Configuration of a [`ZmqServer`](crate::ZmqServer).
#[derive(Debug, Clone)]
pub struct ZmqServerConfig {
    /// Broker socket requests are received from
    pub inbound_address: String,
    /// Broker socket replies are sent to
    pub outbound_address: String,
    /// Payload codec; must match the clients'
    /// Default: JSON
    pub codec: Codec,
    /// How long one receive poll blocks before re-checking for shutdown
    ///
    /// Default: 100ms
    pub receive_timeout: Duration,
}

impl Default for ZmqServerConfig {
    fn default() -> Self {
        BrokerConfig::default().server_config()
    }
}

/// The four broker endpoints.
///
/// Names are from the broker's point of view: clients send into
/// `client_outbound` and read from `client_inbound`; servers read from
/// `server_inbound` and reply into `server_outbound`.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// ROUTER socket replies are routed out of, towards clients
    pub client_inbound: String,
    /// ROUTER socket client requests arrive on
    pub client_outbound: String,
    /// DEALER socket requests are spread from, across servers
    pub server_inbound: String,
    /// DEALER socket server replies arrive on
    pub server_outbound: String,
    /// How long one receive poll blocks before re-checking for shutdown
    ///
    /// Default: 100ms
    pub receive_timeout: Duration,
}

impl BrokerConfig {
    /// TCP endpoints on four consecutive ports starting at `base_port`.
    pub fn tcp(host: &str, base_port: u16) -> Self {
        let endpoint = |offset: u16| format!("tcp://{}:{}", host, base_port + offset);
        BrokerConfig {
            client_inbound: endpoint(0),
            client_outbound: endpoint(1),
            server_inbound: endpoint(2),
            server_outbound: endpoint(3),
            receive_timeout: Duration::from_millis(100),
        }
    }

    /// In-process endpoints; peers must share the broker's `zmq::Context`.
    pub fn inproc(name: &str) -> Self {
        let endpoint = |socket: &str| format!("inproc://{}-{}", name, socket);
        BrokerConfig {
            client_inbound: endpoint("client-inbound"),
            client_outbound: endpoint("client-outbound"),
            server_inbound: endpoint("server-inbound"),
            server_outbound: endpoint("server-outbound"),
            receive_timeout: Duration::from_millis(100),
        }
    }

    /// Client configuration pointing at this broker.
    pub fn client_config(&self) -> ZmqClientConfig {
        ZmqClientConfig {
            inbound_address: self.client_inbound.clone(),
            outbound_address: self.client_outbound.clone(),
            codec: Codec::default(),
            receive_timeout: self.receive_timeout,
        }
    }

    /// Server configuration pointing at this broker.
    pub fn server_config(&self) -> ZmqServerConfig {
        ZmqServerConfig {
            inbound_address: self.server_inbound.clone(),
            outbound_address: self.server_outbound.clone(),
            codec: Codec::default(),
            receive_timeout: self.receive_timeout,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig::tcp("127.0.0.1", 5555)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_endpoints() {
        let config = BrokerConfig::tcp("10.0.0.1", 7000);
        assert_eq!(config.client_inbound, "tcp://10.0.0.1:7000");
        assert_eq!(config.server_outbound, "tcp://10.0.0.1:7003");
    }

    #[test]
    fn test_peer_configs_point_at_broker() {
        let broker = BrokerConfig::inproc("demo");

        let client = broker.client_config();
        assert_eq!(client.inbound_address, broker.client_inbound);
        assert_eq!(client.outbound_address, broker.client_outbound);

        let server = broker.server_config();
        assert_eq!(server.inbound_address, broker.server_inbound);
        assert_eq!(server.outbound_address, broker.server_outbound);
        assert_eq!(server.receive_timeout, Duration::from_millis(100));
    }
}
