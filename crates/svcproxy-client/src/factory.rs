use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;

use svcproxy_common::transport::Client;
use svcproxy_common::{Contract, Result, RpcError};

use crate::channel::ServiceChannel;
use crate::timeout::TimeoutClient;

/// Client-side view of a contract: how to build its proxy.
///
/// `Proxy` is usually a small struct holding a [`ServiceChannel`] and
/// implementing the contract trait by forwarding each method to it.
pub trait ClientContract: Contract {
    type Proxy: Send + Sync + 'static;

    fn connect(channel: ServiceChannel) -> Self::Proxy;
}

type ProxySlot = Arc<OnceLock<Arc<dyn Any + Send + Sync>>>;

/// Hands out one proxy per contract, all sharing the same client.
pub struct ServiceClientFactory {
    client: Arc<dyn Client>,
    runtime: Handle,
    proxies: DashMap<TypeId, ProxySlot>,
}

impl ServiceClientFactory {
    /// Creates a factory over `client`.
    ///
    /// # Errors
    ///
    /// Returns `RpcError::Runtime` when called outside a tokio runtime; the
    /// runtime is kept to drive blocking and begin/end calls.
    pub fn new(client: impl Client + 'static) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| RpcError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(client, runtime))
    }

    pub fn with_runtime(client: impl Client + 'static, runtime: Handle) -> Self {
        ServiceClientFactory {
            client: Arc::new(client),
            runtime,
            proxies: DashMap::new(),
        }
    }

    /// Creates a factory whose requests fail with a `Timeout` fault after `timeout`.
    pub fn with_timeout(client: impl Client + 'static, timeout: Duration) -> Result<Self> {
        Self::new(TimeoutClient::new(client, timeout))
    }

    /// Channel for an arbitrary service id.
    pub fn channel(&self, service_id: &'static str) -> ServiceChannel {
        ServiceChannel::new(Arc::clone(&self.client), service_id, self.runtime.clone())
    }

    /// Returns the proxy for contract `C`, creating it on first use.
    pub fn client<C>(&self) -> Arc<C::Proxy>
    where
        C: ClientContract + ?Sized,
    {
        let slot = self.proxies.entry(TypeId::of::<C>()).or_default().clone();
        let proxy = slot.get_or_init(|| {
            tracing::debug!(service = C::SERVICE_ID, "creating proxy");
            let proxy: Arc<dyn Any + Send + Sync> = Arc::new(C::connect(self.channel(C::SERVICE_ID)));
            proxy
        });

        match Arc::clone(proxy).downcast::<C::Proxy>() {
            Ok(proxy) => proxy,
            // Slots are keyed by the contract's TypeId and only ever hold its proxy.
            Err(_) => unreachable!("proxy slot holds another contract's proxy"),
        }
    }
}
