//! Transport Layer
//!
//! Everything a binding needs besides its network primitive.
//!
//! # Components
//!
//! - **[`Codec`]**: pluggable payload encoding (JSON by default, MessagePack)
//! - **[`frame`]**: the `[length][header][payload]` wire frame and the
//!   request/response header formats
//! - **[`Client`]**: the contract every client binding implements
//! - **[`PendingRequests`]**: correlation-id table for in-flight requests
//!
//! # Example
//!
//! ```
//! use svcproxy_common::protocol::RequestData;
//! use svcproxy_common::transport::{Codec, HeaderLayout, RequestFrame};
//! use serde_json::json;
//!
//! let frame = RequestFrame {
//!     reply_to: None,
//!     correlation_id: "1".to_string(),
//!     request: RequestData::new("demo.Calculator", "Sum", vec![json!(1), json!(2)]),
//! };
//!
//! let bytes = frame.encode(Codec::Json).unwrap();
//! let decoded = RequestFrame::decode(&bytes, HeaderLayout::Routed, Codec::Json).unwrap();
//! assert_eq!(decoded, frame);
//! ```

pub mod client;
pub mod codec;
pub mod frame;
pub mod pending;

pub use client::Client;
pub use codec::{Codec, JsonCodec, MessagePackCodec};
pub use frame::{
    split_frame, write_frame, HeaderLayout, RequestFrame, RequestHeader, ResponseFrame,
};
pub use pending::{PendingRequests, PendingResponse};
