//! svcproxy Client
//!
//! Caller side of svcproxy: turns contract method calls into requests on
//! any [`Client`](svcproxy_common::transport::Client) binding.
//!
//! # Components
//!
//! - **[`ServiceChannel`]**: the call adapter proxies forward to
//! - **[`ClientContract`]**: associates a contract with its proxy type
//! - **[`ServiceClientFactory`]**: one cached proxy per contract
//! - **[`TimeoutClient`]**: deadline decorator for any client
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use futures::future::BoxFuture;
//! use svcproxy_client::{ClientContract, ServiceChannel, ServiceClientFactory};
//! use svcproxy_common::{Contract, Fault};
//! use svcproxy_server::{Instances, LocalClient, Operations, ServiceContract, ServiceFactory};
//!
//! pub trait Calculator: Send + Sync {
//!     fn sum(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>>;
//! }
//!
//! impl Contract for dyn Calculator {
//!     const SERVICE_ID: &'static str = "demo.Calculator";
//! }
//!
//! struct CalculatorProxy(ServiceChannel);
//!
//! impl Calculator for CalculatorProxy {
//!     fn sum(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>> {
//!         self.0.invoke("Sum", (a, b))
//!     }
//! }
//!
//! impl ClientContract for dyn Calculator {
//!     type Proxy = CalculatorProxy;
//!
//!     fn connect(channel: ServiceChannel) -> CalculatorProxy {
//!         CalculatorProxy(channel)
//!     }
//! }
//!
//! impl ServiceContract for dyn Calculator {
//!     fn describe(ops: &mut Operations<Self>) {
//!         ops.future("Sum", |svc, (a, b): (i32, i32)| svc.sum(a, b));
//!     }
//! }
//!
//! struct Adder;
//!
//! impl Calculator for Adder {
//!     fn sum(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>> {
//!         Box::pin(async move { Ok(a + b) })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let instances = Instances::new().with::<dyn Calculator, _>(|| Arc::new(Adder) as Arc<dyn Calculator>);
//! let services = ServiceFactory::new(instances);
//! services.bind::<dyn Calculator>().unwrap();
//!
//! let clients = ServiceClientFactory::new(LocalClient::new(Arc::new(services))).unwrap();
//! let calculator = clients.client::<dyn Calculator>();
//! assert_eq!(calculator.sum(1, 2).await, Ok(3));
//! # }
//! ```

pub mod channel;
pub mod factory;
pub mod timeout;

pub use channel::ServiceChannel;
pub use factory::{ClientContract, ServiceClientFactory};
pub use timeout::TimeoutClient;
