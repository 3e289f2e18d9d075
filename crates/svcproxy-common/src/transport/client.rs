use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::protocol::{RequestData, ResponseData, Result};

/// The transport contract every binding implements.
///
/// Each call gets its own correlated in-flight slot and resolves exactly
/// once. Remote faults come back as `Ok(ResponseData::Fault(..))`; an `Err`
/// means the request never completed a round trip (cancelled, send failure,
/// client shut down).
///
/// Cancelling `cancel` before the response arrives discards the slot and
/// resolves the call with [`RpcError::Cancelled`](crate::RpcError::Cancelled);
/// a response that arrives afterwards is dropped.
#[async_trait]
pub trait Client: Send + Sync {
    async fn request(&self, request: RequestData, cancel: CancellationToken)
        -> Result<ResponseData>;
}

#[async_trait]
impl<C: Client + ?Sized> Client for Arc<C> {
    async fn request(
        &self,
        request: RequestData,
        cancel: CancellationToken,
    ) -> Result<ResponseData> {
        (**self).request(request, cancel).await
    }
}
