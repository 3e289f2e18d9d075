use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::Client;
use svcproxy_common::{Fault, RequestData, ResponseData, Result};

/// Client decorator bounding every request by a deadline.
///
/// When the deadline passes first, the inner request is cancelled (which
/// discards its pending slot) and the caller gets a `Timeout` fault
/// response. A response arriving after that is dropped by the inner client.
pub struct TimeoutClient<C> {
    inner: C,
    timeout: Duration,
}

impl<C: Client> TimeoutClient<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        TimeoutClient { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Client> Client for TimeoutClient<C> {
    async fn request(&self, request: RequestData, cancel: CancellationToken) -> Result<ResponseData> {
        let child = cancel.child_token();
        let operation = request.operation.clone();

        tokio::select! {
            biased;
            response = self.inner.request(request, child.clone()) => response,
            _ = tokio::time::sleep(self.timeout) => {
                child.cancel();
                let timeout_ms = self.timeout.as_millis() as u64;
                tracing::debug!(%operation, timeout_ms, "request timed out");
                Ok(ResponseData::fault(Fault::timeout(timeout_ms)))
            }
        }
    }
}
