use serde_json::Value;

use crate::protocol::{ResponseData, Result};

/// Payload codec used by the transports.
///
/// Framing is fixed by [`frame`](super::frame); only the payload encoding is
/// pluggable. Both ends of a binding must agree on the codec.
///
/// # Example
///
/// ```
/// use svcproxy_common::transport::Codec;
/// use serde_json::json;
///
/// let codec = Codec::default();
/// let encoded = codec.encode_arguments(&[json!(1), json!("two")]).unwrap();
/// let decoded = codec.decode_arguments(&encoded).unwrap();
/// assert_eq!(decoded, vec![json!(1), json!("two")]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Codec {
    /// JSON (default)
    #[default]
    Json,
    /// MessagePack, more compact for numeric payloads
    MessagePack,
}

impl Codec {
    /// Encode a request's argument list
    pub fn encode_arguments(&self, arguments: &[Value]) -> Result<Vec<u8>> {
        match self {
            Codec::Json => JsonCodec::encode(arguments),
            Codec::MessagePack => MessagePackCodec::encode(arguments),
        }
    }

    /// Decode a request's argument list
    pub fn decode_arguments(&self, data: &[u8]) -> Result<Vec<Value>> {
        match self {
            Codec::Json => JsonCodec::decode(data),
            Codec::MessagePack => MessagePackCodec::decode(data),
        }
    }

    /// Encode a response envelope
    pub fn encode_response(&self, response: &ResponseData) -> Result<Vec<u8>> {
        match self {
            Codec::Json => JsonCodec::encode(response),
            Codec::MessagePack => MessagePackCodec::encode(response),
        }
    }

    /// Decode a response envelope
    pub fn decode_response(&self, data: &[u8]) -> Result<ResponseData> {
        match self {
            Codec::Json => JsonCodec::decode(data),
            Codec::MessagePack => MessagePackCodec::decode(data),
        }
    }
}

/// JSON payload encoding.
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// MessagePack payload encoding.
///
/// Structs are written as maps so that `serde_json::Value` arguments keep
/// their field names.
pub struct MessagePackCodec;

impl MessagePackCodec {
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(data)?)
    }
}
