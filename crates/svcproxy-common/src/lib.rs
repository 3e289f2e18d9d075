//! svcproxy Common Types and Transport Contract
//!
//! This crate provides the envelope types, wire framing and transport
//! contract shared by every svcproxy component.
//!
//! # Overview
//!
//! svcproxy turns a plain service trait into a network-callable proxy,
//! independent of the transport carrying the bytes. This crate holds the
//! pieces both ends agree on:
//!
//! - **Protocol Layer**: [`RequestData`], [`ResponseData`], [`Fault`] and [`RpcError`]
//! - **Arguments**: tuple packing/unpacking ([`IntoArguments`], [`FromArguments`])
//! - **Begin/End handle**: [`AsyncResult`]
//! - **Transport Layer**: codec, framing, the [`Client`](transport::Client)
//!   contract and the pending-request table
//!
//! # Architecture
//!
//! - **Message Format**: `[int32 LE header length] + [UTF-8 header] + [payload]`
//! - **Payload**: pluggable codec, JSON by default
//! - **Correlation**: per-client counter, string ids in the header
//!
//! # Example
//!
//! ```
//! use svcproxy_common::{Fault, RequestData, ResponseData};
//! use serde_json::json;
//!
//! let request = RequestData::new("demo.Calculator", "Sum", vec![json!(1), json!(2)]);
//! let response = ResponseData::data(json!(3));
//! assert_eq!(response.into_result(), Ok(json!(3)));
//! ```

pub mod arguments;
pub mod async_result;
pub mod contract;
pub mod protocol;
pub mod transport;

pub use arguments::{FromArguments, IntoArguments};
pub use async_result::{AsyncCallback, AsyncResult, Outcome};
pub use contract::Contract;
pub use protocol::*;
