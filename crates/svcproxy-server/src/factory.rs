//! Service factory
//!
//! Maps a wire service id to a ready [`Dispatch`], building each service at
//! most once. Instances come from a [`Resolver`] (usually [`Instances`]);
//! contracts are bound up front with [`ServiceFactory::bind`], which also
//! validates their operation tables so a broken contract fails at startup
//! instead of on the first request.

use dashmap::DashMap;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use svcproxy_common::{Fault, RequestData, ResponseData, Result, RpcError};

use crate::operations::{OperationTable, ServiceContract};
use crate::service::{Dispatch, Service};

/// Source of service instances.
///
/// The returned box must hold an `Arc<C>` where `C` is the contract type
/// bound under `service_id`.
pub trait Resolver: Send + Sync {
    fn resolve(&self, service_id: &str) -> Option<Box<dyn Any + Send>>;
}

impl<F> Resolver for F
where
    F: Fn(&str) -> Option<Box<dyn Any + Send>> + Send + Sync,
{
    fn resolve(&self, service_id: &str) -> Option<Box<dyn Any + Send>> {
        self(service_id)
    }
}

type Constructor = Arc<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;

/// Closure-backed resolver keyed by contract.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use svcproxy_common::Contract;
/// use svcproxy_server::{Instances, Operations, ServiceContract, ServiceFactory};
///
/// pub trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// impl Contract for dyn Clock {
///     const SERVICE_ID: &'static str = "demo.Clock";
/// }
///
/// impl ServiceContract for dyn Clock {
///     fn describe(ops: &mut Operations<Self>) {
///         ops.sync("Now", |svc, (): ()| Ok(svc.now()));
///     }
/// }
///
/// struct Fixed;
///
/// impl Clock for Fixed {
///     fn now(&self) -> u64 {
///         42
///     }
/// }
///
/// let instances = Instances::new().with::<dyn Clock, _>(|| Arc::new(Fixed) as Arc<dyn Clock>);
/// let factory = ServiceFactory::new(instances);
/// factory.bind::<dyn Clock>().unwrap();
/// assert!(factory.is_bound("demo.Clock"));
/// ```
#[derive(Default, Clone)]
pub struct Instances {
    constructors: HashMap<String, Constructor>,
}

impl Instances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for contract `C`. It runs once per factory.
    pub fn with<C, F>(mut self, constructor: F) -> Self
    where
        C: ServiceContract + ?Sized,
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        let constructor: Constructor =
            Arc::new(move || Box::new(constructor()) as Box<dyn Any + Send>);
        self.constructors.insert(C::SERVICE_ID.to_string(), constructor);
        self
    }

    /// Registers an existing instance for contract `C`.
    pub fn with_instance<C>(self, instance: Arc<C>) -> Self
    where
        C: ServiceContract + ?Sized,
    {
        self.with::<C, _>(move || Arc::clone(&instance))
    }
}

impl Resolver for Instances {
    fn resolve(&self, service_id: &str) -> Option<Box<dyn Any + Send>> {
        self.constructors.get(service_id).map(|constructor| constructor())
    }
}

type Binder = Arc<dyn Fn(Box<dyn Any + Send>) -> Result<Arc<dyn Dispatch>> + Send + Sync>;

/// Resolves services by id and caches them.
///
/// # Architecture
///
/// - **Bindings**: one binder per contract, holding its shared operation table
/// - **Cache**: one `OnceCell` per service id; concurrent first requests
///   for the same id wait on the same construction
pub struct ServiceFactory {
    resolver: Arc<dyn Resolver>,
    binders: DashMap<String, Binder>,
    services: DashMap<String, Arc<OnceCell<Arc<dyn Dispatch>>>>,
}

impl ServiceFactory {
    pub fn new(resolver: impl Resolver + 'static) -> Self {
        ServiceFactory {
            resolver: Arc::new(resolver),
            binders: DashMap::new(),
            services: DashMap::new(),
        }
    }

    /// Makes contract `C` resolvable under its service id.
    ///
    /// # Errors
    ///
    /// Returns the registration error if the contract's operations are
    /// malformed (duplicate names, a `Begin` operation without its `End`).
    pub fn bind<C>(&self) -> Result<&Self>
    where
        C: ServiceContract + ?Sized,
    {
        let table = Arc::new(OperationTable::<C>::for_contract()?);
        let binder: Binder = Arc::new(move |instance: Box<dyn Any + Send>| {
            let instance = instance
                .downcast::<Arc<C>>()
                .map_err(|_| RpcError::ResolutionFailed(C::SERVICE_ID.to_string()))?;
            let service: Arc<dyn Dispatch> = Arc::new(Service::new(*instance, Arc::clone(&table)));
            Ok(service)
        });

        self.binders.insert(C::SERVICE_ID.to_string(), binder);
        tracing::info!(service = C::SERVICE_ID, "bound service contract");
        Ok(self)
    }

    pub fn is_bound(&self, service_id: &str) -> bool {
        self.binders.contains_key(service_id)
    }

    /// Service ids of all bound contracts, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.binders.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Returns the service for `service_id`, building it on first use.
    ///
    /// # Errors
    ///
    /// - `UnknownService` if no contract is bound under the id
    /// - `ResolutionFailed` if the resolver has no instance for it, or gives
    ///   back something other than the bound contract
    ///
    /// A failed construction is not cached; the next call tries again.
    pub async fn service(&self, service_id: &str) -> Result<Arc<dyn Dispatch>> {
        let binder = self
            .binders
            .get(service_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RpcError::UnknownService(service_id.to_string()))?;

        let cell = self.services.entry(service_id.to_string()).or_default().clone();

        let service = cell
            .get_or_try_init(|| async {
                let instance = self
                    .resolver
                    .resolve(service_id)
                    .ok_or_else(|| RpcError::ResolutionFailed(service_id.to_string()))?;
                let service = binder(instance)?;
                tracing::debug!(service = service_id, "constructed service");
                Ok::<_, RpcError>(service)
            })
            .await?;

        Ok(Arc::clone(service))
    }

    /// Resolves the target service and processes `request`.
    ///
    /// Never fails: unknown services and operations, resolution failures and
    /// invocation faults all come back as a fault response.
    pub async fn dispatch(&self, request: RequestData) -> ResponseData {
        let service_id = request.service.clone();
        let operation = request.operation.clone();

        let result = match self.service(&service_id).await {
            Ok(service) => service.process(request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(service = %service_id, %operation, error = %e, "request rejected");
                ResponseData::fault(Fault::from(e))
            }
        }
    }
}
