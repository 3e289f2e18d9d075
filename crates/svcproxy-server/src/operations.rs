//! Operation invokers
//!
//! Every operation of a contract is registered once, under its wire name, in
//! one of three calling conventions:
//!
//! - **sync**: a plain function; runs on the blocking pool so a slow
//!   implementation never stalls the transport
//! - **future**: returns a future; awaited in place
//! - **begin/end**: `Begin<Name>` starts the work and hands back an
//!   [`AsyncResult`]; `End<Name>` collects the result. The pair is matched by
//!   name when the table is built and dispatched under the `Begin` name.
//!
//! All three are normalized to
//! `invoke(instance, arguments) -> Future<Result<Value, Fault>>`. Panics and
//! argument errors become faults. Lazy sequences are collected into an array
//! before the result leaves the invoker.

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;

use svcproxy_common::{
    AsyncCallback, AsyncResult, Contract, Fault, FromArguments, Outcome, Result, RpcError,
};

/// Name prefix of the starting half of a begin/end pair.
pub const BEGIN_PREFIX: &str = "Begin";
/// Name prefix of the completing half of a begin/end pair.
pub const END_PREFIX: &str = "End";

/// Server-side description of a contract.
///
/// # Example
///
/// ```
/// use svcproxy_common::Contract;
/// use svcproxy_server::{Operations, ServiceContract};
///
/// pub trait Calculator: Send + Sync {
///     fn sum(&self, a: i32, b: i32) -> i32;
/// }
///
/// impl Contract for dyn Calculator {
///     const SERVICE_ID: &'static str = "demo.Calculator";
/// }
///
/// impl ServiceContract for dyn Calculator {
///     fn describe(ops: &mut Operations<Self>) {
///         ops.sync("Sum", |svc, (a, b): (i32, i32)| Ok(svc.sum(a, b)));
///     }
/// }
/// ```
pub trait ServiceContract: Contract {
    fn describe(operations: &mut Operations<Self>);
}

/// Markers selecting how an operation result is turned into a value.
pub mod reply {
    /// Any `Serialize` value, sent as-is
    pub struct Plain;
    /// A lazy sequence, collected into an array
    pub struct Sequence;
    /// An optional lazy sequence, collected or sent as null
    pub struct OptionalSequence;
}

/// Conversion of an operation's return value into a wire value.
///
/// The marker parameter is inferred; it only exists so that lazy iterators
/// (which are not `Serialize`) get materialized instead of rejected.
pub trait IntoReply<M> {
    fn into_reply(self) -> Outcome;
}

impl<T: Serialize> IntoReply<reply::Plain> for T {
    fn into_reply(self) -> Outcome {
        serde_json::to_value(self).map_err(|e| Fault::from_error(&e))
    }
}

impl<I> IntoReply<reply::Sequence> for I
where
    I: Iterator,
    I::Item: Serialize,
{
    fn into_reply(self) -> Outcome {
        let items = self
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Fault::from_error(&e))?;
        Ok(Value::Array(items))
    }
}

impl<I> IntoReply<reply::OptionalSequence> for Option<I>
where
    I: Iterator,
    I::Item: Serialize,
{
    fn into_reply(self) -> Outcome {
        match self {
            Some(items) => <I as IntoReply<reply::Sequence>>::into_reply(items),
            None => Ok(Value::Null),
        }
    }
}

type SyncInvoke<C> = Arc<dyn Fn(&C, Vec<Value>) -> Outcome + Send + Sync>;
type FutureInvoke<C> = Arc<dyn Fn(Arc<C>, Vec<Value>) -> BoxFuture<'static, Outcome> + Send + Sync>;
type BeginInvoke<C> =
    Arc<dyn Fn(&C, Vec<Value>, AsyncCallback) -> std::result::Result<AsyncResult, Fault> + Send + Sync>;
type EndInvoke<C> = Arc<dyn Fn(&C, &AsyncResult) -> Outcome + Send + Sync>;

enum Convention<C: ?Sized> {
    Sync(SyncInvoke<C>),
    Future(FutureInvoke<C>),
    Begin(BeginInvoke<C>),
}

/// Registration builder handed to [`ServiceContract::describe`].
pub struct Operations<C: ?Sized> {
    service: &'static str,
    operations: Vec<(String, Convention<C>)>,
    ends: Vec<(String, EndInvoke<C>)>,
}

impl<C> Operations<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub fn new(service: &'static str) -> Self {
        Operations {
            service,
            operations: Vec::new(),
            ends: Vec::new(),
        }
    }

    /// Registers a synchronous operation.
    pub fn sync<A, R, M, F>(&mut self, name: &str, operation: F) -> &mut Self
    where
        A: FromArguments + 'static,
        R: IntoReply<M> + 'static,
        M: 'static,
        F: Fn(&C, A) -> std::result::Result<R, Fault> + Send + Sync + 'static,
    {
        let invoke: SyncInvoke<C> = Arc::new(move |instance: &C, arguments: Vec<Value>| {
            let reply = operation(instance, A::from_arguments(arguments)?)?;
            <R as IntoReply<M>>::into_reply(reply)
        });
        self.operations.push((name.to_string(), Convention::Sync(invoke)));
        self
    }

    /// Registers an operation that returns a future.
    pub fn future<A, R, M, F, Fut>(&mut self, name: &str, operation: F) -> &mut Self
    where
        A: FromArguments + Send + 'static,
        R: IntoReply<M> + 'static,
        M: 'static,
        F: Fn(Arc<C>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Fault>> + Send + 'static,
    {
        let invoke: FutureInvoke<C> = Arc::new(move |instance: Arc<C>, arguments: Vec<Value>| {
            match A::from_arguments(arguments) {
                Ok(arguments) => operation(instance, arguments)
                    .map(|outcome| outcome.and_then(<R as IntoReply<M>>::into_reply))
                    .boxed(),
                Err(fault) => futures::future::ready(Err(fault)).boxed(),
            }
        });
        self.operations.push((name.to_string(), Convention::Future(invoke)));
        self
    }

    /// Registers the starting half of a begin/end pair.
    ///
    /// `name` must start with `Begin`; the matching `End` half must be
    /// registered with [`end`](Self::end) before the table is built.
    pub fn begin<A, F>(&mut self, name: &str, operation: F) -> &mut Self
    where
        A: FromArguments + 'static,
        F: Fn(&C, A, Option<AsyncCallback>, Option<Value>) -> AsyncResult + Send + Sync + 'static,
    {
        let invoke: BeginInvoke<C> = Arc::new(
            move |instance: &C, arguments: Vec<Value>, callback: AsyncCallback| {
                Ok(operation(instance, A::from_arguments(arguments)?, Some(callback), None))
            },
        );
        self.operations.push((name.to_string(), Convention::Begin(invoke)));
        self
    }

    /// Registers the completing half of a begin/end pair.
    pub fn end<R, M, F>(&mut self, name: &str, operation: F) -> &mut Self
    where
        R: IntoReply<M> + 'static,
        M: 'static,
        F: Fn(&C, &AsyncResult) -> std::result::Result<R, Fault> + Send + Sync + 'static,
    {
        let invoke: EndInvoke<C> = Arc::new(move |instance: &C, handle: &AsyncResult| {
            let reply = operation(instance, handle)?;
            <R as IntoReply<M>>::into_reply(reply)
        });
        self.ends.push((name.to_string(), invoke));
        self
    }

    /// Validates the registrations and builds the dispatch table.
    ///
    /// # Errors
    ///
    /// - `InvalidOperationName` for empty names, names containing `:`,
    ///   a begin half without the `Begin` prefix or an end half nobody uses
    /// - `DuplicateOperation` when a name is registered twice
    /// - `MissingEndOperation` when a `Begin<Name>` has no `End<Name>`
    pub fn build(self) -> Result<OperationTable<C>> {
        let service = self.service;
        let mut seen = HashSet::new();
        for name in self
            .operations
            .iter()
            .map(|(name, _)| name)
            .chain(self.ends.iter().map(|(name, _)| name))
        {
            if name.is_empty() || name.contains(':') {
                return Err(RpcError::InvalidOperationName(name.clone()));
            }
            if !seen.insert(name.as_str()) {
                return Err(RpcError::DuplicateOperation {
                    service: service.to_string(),
                    operation: name.clone(),
                });
            }
        }

        let mut ends: HashMap<String, EndInvoke<C>> = self.ends.into_iter().collect();
        let mut invokers = HashMap::with_capacity(self.operations.len());

        for (name, convention) in self.operations {
            let kind = match convention {
                Convention::Sync(invoke) => InvokerKind::Sync(invoke),
                Convention::Future(invoke) => InvokerKind::Future(invoke),
                Convention::Begin(begin) => {
                    let stem = name
                        .strip_prefix(BEGIN_PREFIX)
                        .filter(|stem| !stem.is_empty())
                        .ok_or_else(|| RpcError::InvalidOperationName(name.clone()))?;
                    let end_name = format!("{}{}", END_PREFIX, stem);
                    let end = ends.remove(&end_name).ok_or_else(|| RpcError::MissingEndOperation {
                        service: service.to_string(),
                        begin: name.clone(),
                        end: end_name.clone(),
                    })?;
                    InvokerKind::BeginEnd { begin, end }
                }
            };

            invokers.insert(name.clone(), OperationInvoker { name, kind });
        }

        if let Some(orphan) = ends.into_keys().next() {
            return Err(RpcError::InvalidOperationName(orphan));
        }

        tracing::debug!(service, operations = invokers.len(), "built operation table");
        Ok(OperationTable { service, invokers })
    }
}

enum InvokerKind<C: ?Sized> {
    Sync(SyncInvoke<C>),
    Future(FutureInvoke<C>),
    BeginEnd {
        begin: BeginInvoke<C>,
        end: EndInvoke<C>,
    },
}

/// Adapter executing one operation, whatever its calling convention.
pub struct OperationInvoker<C: ?Sized> {
    name: String,
    kind: InvokerKind<C>,
}

impl<C> OperationInvoker<C>
where
    C: ?Sized + Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the operation against `instance`.
    ///
    /// The returned future never panics; every failure is carried as a fault.
    pub fn invoke(&self, instance: Arc<C>, arguments: Vec<Value>) -> BoxFuture<'static, Outcome> {
        match &self.kind {
            InvokerKind::Sync(operation) => {
                let operation = Arc::clone(operation);
                async move {
                    let worker = tokio::task::spawn_blocking(move || operation(&*instance, arguments));
                    match worker.await {
                        Ok(outcome) => outcome,
                        Err(e) if e.is_panic() => Err(Fault::from_panic(&*e.into_panic())),
                        Err(e) => Err(Fault::new(Fault::CANCELLED, e.to_string())),
                    }
                }
                .boxed()
            }
            InvokerKind::Future(operation) => {
                match std::panic::catch_unwind(AssertUnwindSafe(|| operation(instance, arguments))) {
                    Ok(future) => AssertUnwindSafe(future)
                        .catch_unwind()
                        .map(|outcome| outcome.unwrap_or_else(|panic| Err(Fault::from_panic(&*panic))))
                        .boxed(),
                    Err(panic) => futures::future::ready(Err(Fault::from_panic(&*panic))).boxed(),
                }
            }
            InvokerKind::BeginEnd { begin, end } => invoke_begin_end(begin, end, instance, arguments),
        }
    }
}

/// Starts a begin/end operation and completes from its callback.
fn invoke_begin_end<C>(
    begin: &BeginInvoke<C>,
    end: &EndInvoke<C>,
    instance: Arc<C>,
    arguments: Vec<Value>,
) -> BoxFuture<'static, Outcome>
where
    C: ?Sized + Send + Sync + 'static,
{
    let (tx, rx) = oneshot::channel::<Outcome>();
    let tx = Mutex::new(Some(tx));
    let end = Arc::clone(end);
    let target = Arc::clone(&instance);

    let callback: AsyncCallback = Arc::new(move |handle: &AsyncResult| {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| end(&*target, handle)))
            .unwrap_or_else(|panic| Err(Fault::from_panic(&*panic)));
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(outcome);
        }
    });

    let started = std::panic::catch_unwind(AssertUnwindSafe(|| begin(&*instance, arguments, callback)))
        .unwrap_or_else(|panic| Err(Fault::from_panic(&*panic)));

    async move {
        started?;
        rx.await.unwrap_or_else(|_| {
            Err(Fault::new(
                Fault::PANIC,
                "begin operation dropped its completion callback",
            ))
        })
    }
    .boxed()
}

/// Dispatch table of one contract, keyed by wire operation name.
///
/// Built once per contract type and shared by every instance bound to it.
pub struct OperationTable<C: ?Sized> {
    service: &'static str,
    invokers: HashMap<String, OperationInvoker<C>>,
}

impl<C> OperationTable<C>
where
    C: ServiceContract + ?Sized,
{
    /// Builds the table described by the contract.
    pub fn for_contract() -> Result<Self> {
        let mut operations = Operations::new(C::SERVICE_ID);
        C::describe(&mut operations);
        operations.build()
    }
}

impl<C: ?Sized> OperationTable<C> {
    pub fn service_id(&self) -> &'static str {
        self.service
    }

    pub fn get(&self, operation: &str) -> Option<&OperationInvoker<C>> {
        self.invokers.get(operation)
    }

    /// Wire names of all operations, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.invokers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.invokers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invokers.is_empty()
    }
}
