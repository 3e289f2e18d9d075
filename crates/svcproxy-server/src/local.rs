use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::Client;
use svcproxy_common::{RequestData, ResponseData, Result, RpcError};

use crate::factory::ServiceFactory;

/// In-process client that dispatches straight into a [`ServiceFactory`].
///
/// Useful for tests and for hosting a service next to its callers without
/// a network hop. Cancellation behaves as for the remote bindings.
#[derive(Clone)]
pub struct LocalClient {
    factory: Arc<ServiceFactory>,
}

impl LocalClient {
    pub fn new(factory: Arc<ServiceFactory>) -> Self {
        LocalClient { factory }
    }
}

#[async_trait]
impl Client for LocalClient {
    async fn request(&self, request: RequestData, cancel: CancellationToken) -> Result<ResponseData> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RpcError::Cancelled),
            response = self.factory.dispatch(request) => Ok(response),
        }
    }
}
