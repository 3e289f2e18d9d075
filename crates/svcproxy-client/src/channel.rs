use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::Client;
use svcproxy_common::{AsyncCallback, AsyncResult, Fault, IntoArguments, RequestData, ResponseData};

/// Call adapter bound to one service on one client.
///
/// Generated proxies route every contract method through one of the four
/// entry points below, matching the method's calling convention:
///
/// - [`invoke`](Self::invoke): future-returning methods
/// - [`call`](Self::call): plain blocking methods
/// - [`begin`](Self::begin) / [`end`](Self::end): the begin/end pair
///
/// A remote fault is returned as the [`Fault`] itself. Transport failures
/// are converted into the matching fault kind (`Cancelled`, `Transport`, ..).
#[derive(Clone)]
pub struct ServiceChannel {
    client: Arc<dyn Client>,
    service_id: &'static str,
    runtime: Handle,
}

impl ServiceChannel {
    pub fn new(client: Arc<dyn Client>, service_id: &'static str, runtime: Handle) -> Self {
        ServiceChannel {
            client,
            service_id,
            runtime,
        }
    }

    pub fn service_id(&self) -> &'static str {
        self.service_id
    }

    /// Sends `operation` and resolves with its decoded result.
    pub fn invoke<A, R>(&self, operation: &str, arguments: A) -> BoxFuture<'static, Result<R, Fault>>
    where
        A: IntoArguments,
        R: DeserializeOwned + Send + 'static,
    {
        self.invoke_with(operation, arguments, CancellationToken::new())
    }

    /// Like [`invoke`](Self::invoke), abandoning the call when `cancel` fires.
    pub fn invoke_with<A, R>(
        &self,
        operation: &str,
        arguments: A,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<R, Fault>>
    where
        A: IntoArguments,
        R: DeserializeOwned + Send + 'static,
    {
        let response = self.send(operation, arguments, cancel);
        async move { decode(response.await?) }.boxed()
    }

    /// Sends `operation` and blocks the calling thread until it completes.
    ///
    /// Must not be called from a runtime worker thread; use
    /// [`invoke`](Self::invoke) there.
    pub fn call<A, R>(&self, operation: &str, arguments: A) -> Result<R, Fault>
    where
        A: IntoArguments,
        R: DeserializeOwned,
    {
        let handle = self.begin(operation, arguments, None, None);
        self.end(&handle)
    }

    /// Starts `operation` without waiting for it.
    ///
    /// `callback` runs once the returned handle has settled; `state` is
    /// available from the handle as [`AsyncResult::async_state`].
    pub fn begin<A>(
        &self,
        operation: &str,
        arguments: A,
        callback: Option<AsyncCallback>,
        state: Option<Value>,
    ) -> AsyncResult
    where
        A: IntoArguments,
    {
        let response = self.send(operation, arguments, CancellationToken::new());
        let outcome = async move { response.await?.into_result() };
        AsyncResult::spawn(&self.runtime, outcome, callback, state)
    }

    /// Blocks until the operation started by [`begin`](Self::begin) completes.
    pub fn end<R: DeserializeOwned>(&self, handle: &AsyncResult) -> Result<R, Fault> {
        let value = handle.wait()?;
        serde_json::from_value(value)
            .map_err(|e| Fault::new(Fault::INVALID_RESPONSE, e.to_string()))
    }

    fn send<A: IntoArguments>(
        &self,
        operation: &str,
        arguments: A,
        cancel: CancellationToken,
    ) -> BoxFuture<'static, Result<ResponseData, Fault>> {
        let arguments = match arguments.into_arguments() {
            Ok(arguments) => arguments,
            Err(e) => return futures::future::ready(Err(Fault::from(e))).boxed(),
        };

        let request = RequestData::new(self.service_id, operation, arguments);
        let client = Arc::clone(&self.client);
        tracing::debug!(service = self.service_id, operation, "sending request");

        async move { client.request(request, cancel).await.map_err(Fault::from) }.boxed()
    }
}

fn decode<R: DeserializeOwned>(response: ResponseData) -> Result<R, Fault> {
    let value = response.into_result()?;
    serde_json::from_value(value).map_err(|e| Fault::new(Fault::INVALID_RESPONSE, e.to_string()))
}
