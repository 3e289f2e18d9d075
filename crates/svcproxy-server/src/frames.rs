use bytes::Bytes;

use svcproxy_common::transport::{split_frame, Codec, HeaderLayout, RequestHeader, ResponseFrame};
use svcproxy_common::{Fault, ResponseData};

use crate::factory::ServiceFactory;

/// Encoded answer to one request frame.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Queue named by the request header, for queue bindings
    pub reply_to: Option<String>,
    pub correlation_id: String,
    pub frame: Bytes,
}

/// Decodes a request frame, dispatches it and encodes the response frame.
///
/// Returns `None` when the frame is too malformed to answer (bad length
/// prefix or header); that request can only time out on the caller. A
/// request whose arguments fail to decode is answered with an
/// `InvalidArguments` fault.
pub async fn handle_frame(
    factory: &ServiceFactory,
    frame: &[u8],
    layout: HeaderLayout,
    codec: Codec,
) -> Option<Reply> {
    let parsed = split_frame(frame).and_then(|(header, payload)| {
        RequestHeader::parse(header, layout).map(|header| (header, payload))
    });
    let (header, payload) = match parsed {
        Ok(parts) => parts,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed request frame");
            return None;
        }
    };

    let reply_to = header.reply_to.clone();
    let correlation_id = header.correlation_id.clone();

    let response = match codec.decode_arguments(payload) {
        Ok(arguments) => {
            let request = header.into_frame(arguments).request;
            tracing::debug!(
                %correlation_id,
                service = %request.service,
                operation = %request.operation,
                "dispatching request"
            );
            factory.dispatch(request).await
        }
        Err(e) => ResponseData::fault(Fault::invalid_arguments(e.to_string())),
    };

    let encoded = ResponseFrame {
        correlation_id: correlation_id.clone(),
        response,
    }
    .encode(codec)
    .or_else(|e| {
        // The result itself could not be encoded; answer with why.
        ResponseFrame {
            correlation_id: correlation_id.clone(),
            response: ResponseData::fault(Fault::new(Fault::INVALID_RESPONSE, e.to_string())),
        }
        .encode(codec)
    });

    match encoded {
        Ok(frame) => Some(Reply {
            reply_to,
            correlation_id,
            frame,
        }),
        Err(e) => {
            tracing::warn!(%correlation_id, error = %e, "failed to encode response");
            None
        }
    }
}
