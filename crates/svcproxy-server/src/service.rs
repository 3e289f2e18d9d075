use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use svcproxy_common::{RequestData, ResponseData, Result, RpcError};

use crate::operations::{OperationTable, ServiceContract};

/// A resolved service, with its contract type erased.
///
/// This is what transports dispatch to.
pub trait Dispatch: Send + Sync {
    fn service_id(&self) -> &str;

    /// Wire names of the operations this service answers.
    fn operations(&self) -> Vec<String>;

    /// Runs the requested operation and captures its outcome.
    ///
    /// Invocation faults (errors returned or panics raised by the
    /// operation, bad arguments) come back as `Ok(ResponseData::Fault(..))`.
    /// The only error is `UnknownOperation`.
    fn process(&self, request: RequestData) -> BoxFuture<'static, Result<ResponseData>>;
}

/// One service instance bound to its contract's dispatch table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use svcproxy_common::{Contract, RequestData, ResponseData};
/// use svcproxy_server::{Dispatch, Operations, Service, ServiceContract};
///
/// pub trait Greeter: Send + Sync {
///     fn greet(&self, name: String) -> String;
/// }
///
/// impl Contract for dyn Greeter {
///     const SERVICE_ID: &'static str = "demo.Greeter";
/// }
///
/// impl ServiceContract for dyn Greeter {
///     fn describe(ops: &mut Operations<Self>) {
///         ops.sync("Greet", |svc, (name,): (String,)| Ok(svc.greet(name)));
///     }
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self, name: String) -> String {
///         format!("Hello, {}", name)
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let instance: Arc<dyn Greeter> = Arc::new(English);
/// let service = Service::for_contract(instance).unwrap();
///
/// let request = RequestData::new("demo.Greeter", "Greet", vec![json!("Ada")]);
/// let response = service.process(request).await.unwrap();
/// assert_eq!(response, ResponseData::data(json!("Hello, Ada")));
/// # }
/// ```
pub struct Service<C: ?Sized> {
    instance: Arc<C>,
    table: Arc<OperationTable<C>>,
}

impl<C> Service<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    /// Binds `instance` to an already built table.
    pub fn new(instance: Arc<C>, table: Arc<OperationTable<C>>) -> Self {
        Service { instance, table }
    }

    /// Builds the contract's table and binds `instance` to it.
    pub fn for_contract(instance: Arc<C>) -> Result<Self>
    where
        C: ServiceContract,
    {
        Ok(Service::new(instance, Arc::new(OperationTable::for_contract()?)))
    }

    pub fn instance(&self) -> &Arc<C> {
        &self.instance
    }
}

impl<C> Dispatch for Service<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    fn service_id(&self) -> &str {
        self.table.service_id()
    }

    fn operations(&self) -> Vec<String> {
        self.table.names()
    }

    fn process(&self, request: RequestData) -> BoxFuture<'static, Result<ResponseData>> {
        let Some(invoker) = self.table.get(&request.operation) else {
            return futures::future::ready(Err(RpcError::UnknownOperation {
                service: self.table.service_id().to_string(),
                operation: request.operation,
            }))
            .boxed();
        };

        let service = self.table.service_id().to_string();
        let operation = request.operation;
        let call = invoker.invoke(Arc::clone(&self.instance), request.arguments);

        async move {
            let outcome = call.await;
            if let Err(fault) = &outcome {
                tracing::debug!(%service, %operation, %fault, "operation faulted");
            }
            Ok(ResponseData::from(outcome))
        }
        .boxed()
    }
}
