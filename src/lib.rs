//! svcproxy
//!
//! Transport-independent service proxies. A service is a plain Rust trait;
//! svcproxy exposes an implementation of it over a transport binding and
//! hands callers a proxy implementing the same trait.
//!
//! # Crates
//!
//! - [`common`]: envelopes, faults, framing and the [`Client`](transport::Client) contract
//! - [`server`]: operation registration, dispatch and the service factory
//! - [`client`]: the call adapter, proxy registry and timeout decorator
//! - [`zmq`]: broker-routed ZeroMQ binding
//! - [`queue`]: list-queue binding over Redis
//!
//! The most used items are re-exported at the crate root.

pub use svcproxy_client as client;
pub use svcproxy_common as common;
pub use svcproxy_queue as queue;
pub use svcproxy_server as server;
pub use svcproxy_zmq as zmq;

pub use svcproxy_common::transport;

pub use svcproxy_client::{ClientContract, ServiceChannel, ServiceClientFactory, TimeoutClient};
pub use svcproxy_common::{
    AsyncCallback, AsyncResult, Contract, Fault, RequestData, ResponseData, Result, RpcError,
};
pub use svcproxy_server::{
    Instances, LocalClient, Operations, ServiceContract, ServiceFactory,
};
