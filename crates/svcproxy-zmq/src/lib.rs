//! svcproxy ZeroMQ Binding
//!
//! Broker-routed socket transport: many clients and many interchangeable
//! servers meet at a [`ZmqBroker`], which load-balances requests across the
//! servers and routes each reply back to the client that asked.
//!
//! # Components
//!
//! - **[`ZmqClient`]**: [`Client`](svcproxy_common::transport::Client)
//!   implementation with lazily started send and receive loops
//! - **[`ZmqServer`]**: feeds requests from the broker into a
//!   [`ServiceFactory`](svcproxy_server::ServiceFactory)
//! - **[`ZmqBroker`]**: the ROUTER/DEALER relay
//! - **[`BrokerConfig`]**: the four endpoints, and the peer configs derived
//!   from them
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use svcproxy_server::{Instances, ServiceFactory};
//! use svcproxy_zmq::{BrokerConfig, ZmqBroker, ZmqClient, ZmqServer};
//!
//! # #[tokio::main]
//! # async fn main() -> svcproxy_common::Result<()> {
//! let context = zmq::Context::new();
//! let config = BrokerConfig::tcp("127.0.0.1", 5555);
//!
//! let broker = ZmqBroker::new(&context, config.clone());
//! broker.listen()?;
//!
//! let factory = Arc::new(ServiceFactory::new(Instances::new()));
//! let server = ZmqServer::new(&context, config.server_config(), factory);
//! server.listen()?;
//!
//! let client = ZmqClient::new(&context, config.client_config())?;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod server;
mod socket;
mod worker;

pub use broker::{BrokerStats, ZmqBroker};
pub use client::ZmqClient;
pub use config::{BrokerConfig, ZmqClientConfig, ZmqServerConfig};
pub use server::ZmqServer;
