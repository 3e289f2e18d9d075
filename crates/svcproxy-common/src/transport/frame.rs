//! Wire framing shared by every binding.
//!
//! ```text
//! [int32 little-endian header length] [UTF-8 header] [payload]
//! ```
//!
//! Request headers are colon-joined:
//!
//! - socket bindings: `correlationId:serviceId:operation`
//! - queue bindings:  `replyQueue:correlationId:serviceId:operation`
//!
//! Response headers carry only the correlation id. The service id may itself
//! contain colons (Rust paths do), so it is recovered as everything between
//! the fixed leading fields and the trailing operation name.

use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use crate::protocol::{RequestData, ResponseData, Result, RpcError};
use crate::transport::Codec;

/// Size of the header length prefix.
pub const HEADER_PREFIX_LEN: usize = 4;

/// Header separator.
pub const HEADER_SEPARATOR: char = ':';

/// Writes one frame.
pub fn write_frame(header: &str, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(HEADER_PREFIX_LEN + header.len() + payload.len());
    frame.put_i32_le(header.len() as i32);
    frame.put_slice(header.as_bytes());
    frame.put_slice(payload);
    frame.freeze()
}

/// Splits a frame into its header and payload.
///
/// # Errors
///
/// Returns `InvalidFrame` if the prefix is truncated, the header length is
/// negative or runs past the end of the frame, or the header is not UTF-8.
pub fn split_frame(frame: &[u8]) -> Result<(&str, &[u8])> {
    if frame.len() < HEADER_PREFIX_LEN {
        return Err(RpcError::InvalidFrame(format!(
            "frame too short: {} bytes",
            frame.len()
        )));
    }

    let mut prefix = [0u8; HEADER_PREFIX_LEN];
    prefix.copy_from_slice(&frame[..HEADER_PREFIX_LEN]);
    let header_len = i32::from_le_bytes(prefix);

    let body = &frame[HEADER_PREFIX_LEN..];
    if header_len < 0 || header_len as usize > body.len() {
        return Err(RpcError::InvalidFrame(format!(
            "header length {} out of range for {} byte body",
            header_len,
            body.len()
        )));
    }

    let (header, payload) = body.split_at(header_len as usize);
    Ok((std::str::from_utf8(header)?, payload))
}

/// Which request header variant a binding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// `correlationId:serviceId:operation`; replies routed by socket identity
    Routed,
    /// `replyQueue:correlationId:serviceId:operation`
    Queued,
}

/// A request as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    /// Queue the server answers on (queue bindings only)
    pub reply_to: Option<String>,
    pub correlation_id: String,
    pub request: RequestData,
}

impl RequestFrame {
    pub fn encode(&self, codec: Codec) -> Result<Bytes> {
        let mut header = String::new();
        if let Some(reply_to) = &self.reply_to {
            header.push_str(reply_to);
            header.push(HEADER_SEPARATOR);
        }
        header.push_str(&self.correlation_id);
        header.push(HEADER_SEPARATOR);
        header.push_str(&self.request.service);
        header.push(HEADER_SEPARATOR);
        header.push_str(&self.request.operation);

        let payload = codec.encode_arguments(&self.request.arguments)?;
        Ok(write_frame(&header, &payload))
    }

    pub fn decode(frame: &[u8], layout: HeaderLayout, codec: Codec) -> Result<Self> {
        let (header, payload) = split_frame(frame)?;
        let header = RequestHeader::parse(header, layout)?;
        let arguments = codec.decode_arguments(payload)?;
        Ok(header.into_frame(arguments))
    }
}

/// The parsed header of a request frame.
///
/// Servers read the header before the payload so that a request whose
/// arguments fail to decode can still be answered with a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub reply_to: Option<String>,
    pub correlation_id: String,
    pub service: String,
    pub operation: String,
}

impl RequestHeader {
    /// Parses a header string.
    ///
    /// The correlation id (and reply queue) end at the first separator and
    /// the operation starts after the last one, so service ids may contain
    /// `:` themselves.
    pub fn parse(header: &str, layout: HeaderLayout) -> Result<Self> {
        let malformed = || RpcError::InvalidFrame(format!("malformed request header '{}'", header));

        let (reply_to, rest) = match layout {
            HeaderLayout::Routed => (None, header),
            HeaderLayout::Queued => {
                let (queue, rest) = header.split_once(HEADER_SEPARATOR).ok_or_else(malformed)?;
                (Some(queue.to_string()), rest)
            }
        };

        let (correlation_id, rest) = rest.split_once(HEADER_SEPARATOR).ok_or_else(malformed)?;
        let (service, operation) = rest.rsplit_once(HEADER_SEPARATOR).ok_or_else(malformed)?;
        if correlation_id.is_empty() || service.is_empty() || operation.is_empty() {
            return Err(malformed());
        }
        if reply_to.as_deref() == Some("") {
            return Err(malformed());
        }

        Ok(RequestHeader {
            reply_to,
            correlation_id: correlation_id.to_string(),
            service: service.to_string(),
            operation: operation.to_string(),
        })
    }

    pub fn into_frame(self, arguments: Vec<Value>) -> RequestFrame {
        RequestFrame {
            reply_to: self.reply_to,
            correlation_id: self.correlation_id,
            request: RequestData::new(self.service, self.operation, arguments),
        }
    }
}

/// A response as it travels on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFrame {
    pub correlation_id: String,
    pub response: ResponseData,
}

impl ResponseFrame {
    pub fn encode(&self, codec: Codec) -> Result<Bytes> {
        let payload = codec.encode_response(&self.response)?;
        Ok(write_frame(&self.correlation_id, &payload))
    }

    pub fn decode(frame: &[u8], codec: Codec) -> Result<Self> {
        let (header, payload) = split_frame(frame)?;
        Ok(ResponseFrame {
            correlation_id: header.to_string(),
            response: codec.decode_response(payload)?,
        })
    }
}
