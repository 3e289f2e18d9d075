//! svcproxy Queue Binding
//!
//! Transport over a shared list store such as Redis. Servers pop requests
//! from one well-known queue; each client owns a private reply queue whose
//! name travels in the request header, so replies find their way back
//! without any broker process.
//!
//! # Architecture
//!
//! ```text
//! QueueClient ──push──► [request queue] ──pop──► QueueServer(s)
//!      ▲                                               │
//!      └────pop──── [client reply queue] ◄───push──────┘
//! ```
//!
//! Both sides poll with a growing back-off while their queue is empty.
//!
//! # Components
//!
//! - **[`QueueClient`]**: [`Client`](svcproxy_common::transport::Client)
//!   implementation; its receive task starts with the first request
//! - **[`QueueServer`]**: feeds popped requests into a
//!   [`ServiceFactory`](svcproxy_server::ServiceFactory)
//! - **[`ListStore`]**: the two list operations the binding needs, with
//!   [`RedisStore`] and [`MemoryStore`] implementations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use svcproxy_queue::{
//!     QueueClient, QueueClientConfig, QueueServer, QueueServerConfig, RedisConfig, RedisStore,
//! };
//! use svcproxy_server::{Instances, ServiceFactory};
//!
//! # #[tokio::main]
//! # async fn main() -> svcproxy_common::Result<()> {
//! let store = RedisStore::connect(&RedisConfig::default()).await?;
//!
//! let factory = Arc::new(ServiceFactory::new(Instances::new()));
//! let server = QueueServer::new(store.clone(), QueueServerConfig::new("calculator"), factory);
//! server.listen()?;
//!
//! let client = QueueClient::new(store, QueueClientConfig::new("calculator"))?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod poller;
pub mod server;
pub mod store;

pub use client::QueueClient;
pub use config::{PollBackoff, QueueClientConfig, QueueServerConfig, RedisConfig};
pub use server::QueueServer;
pub use store::{ListStore, MemoryStore, RedisStore};
