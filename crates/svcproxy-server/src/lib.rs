//! svcproxy Server
//!
//! Server-side dispatch core: turns a [`RequestData`](svcproxy_common::RequestData)
//! into a [`ResponseData`](svcproxy_common::ResponseData) by calling the right
//! operation on the right service instance.
//!
//! # Components
//!
//! - **[`Operations`] / [`OperationTable`]**: per-contract registration and
//!   the invokers normalizing the sync, future and begin/end conventions
//! - **[`Service`]**: one instance bound to its table, type-erased as [`Dispatch`]
//! - **[`ServiceFactory`]**: id -> service resolution with at-most-once
//!   construction, and the fault-converting [`ServiceFactory::dispatch`]
//!   every server binding calls
//! - **[`handle_frame`]**: request frame in, response frame out, shared by
//!   the network bindings
//! - **[`LocalClient`]**: an in-process [`Client`](svcproxy_common::transport::Client)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use svcproxy_common::{Contract, RequestData, ResponseData};
//! use svcproxy_server::{Instances, Operations, ServiceContract, ServiceFactory};
//!
//! pub trait Calculator: Send + Sync {
//!     fn sum(&self, a: i32, b: i32) -> i32;
//! }
//!
//! impl Contract for dyn Calculator {
//!     const SERVICE_ID: &'static str = "demo.Calculator";
//! }
//!
//! impl ServiceContract for dyn Calculator {
//!     fn describe(ops: &mut Operations<Self>) {
//!         ops.sync("Sum", |svc, (a, b): (i32, i32)| Ok(svc.sum(a, b)));
//!     }
//! }
//!
//! struct Adder;
//!
//! impl Calculator for Adder {
//!     fn sum(&self, a: i32, b: i32) -> i32 {
//!         a + b
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let instances = Instances::new().with::<dyn Calculator, _>(|| Arc::new(Adder) as Arc<dyn Calculator>);
//! let factory = ServiceFactory::new(instances);
//! factory.bind::<dyn Calculator>().unwrap();
//!
//! let request = RequestData::new("demo.Calculator", "Sum", vec![json!(1), json!(2)]);
//! assert_eq!(factory.dispatch(request).await, ResponseData::data(json!(3)));
//! # }
//! ```

pub mod factory;
pub mod frames;
pub mod local;
pub mod operations;
pub mod service;

pub use factory::{Instances, Resolver, ServiceFactory};
pub use frames::{handle_frame, Reply};
pub use local::LocalClient;
pub use operations::{
    reply, IntoReply, OperationInvoker, OperationTable, Operations, ServiceContract, BEGIN_PREFIX,
    END_PREFIX,
};
pub use service::{Dispatch, Service};
