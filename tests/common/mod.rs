//! Shared fixtures for the end-to-end tests: a test service contract, its
//! implementation and proxy, and one harness per transport binding.

#![allow(dead_code)]

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use svcproxy::queue::{MemoryStore, QueueClient, QueueClientConfig, QueueServer, QueueServerConfig};
use svcproxy::transport::Client;
use svcproxy::zmq::{BrokerConfig, ZmqBroker, ZmqClient, ZmqServer};
use svcproxy::{
    AsyncCallback, AsyncResult, ClientContract, Contract, Fault, Instances, LocalClient,
    Operations, ServiceChannel, ServiceClientFactory, ServiceContract, ServiceFactory,
};

pub const PERSONS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

impl Person {
    pub fn numbered(i: u32) -> Self {
        Person {
            name: format!("Person {}", i),
            age: i * 10,
        }
    }
}

pub trait TestService: Send + Sync {
    fn sum(&self, a: i32, b: i32) -> Result<i32, Fault>;
    fn sum_async(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>>;
    fn begin_sum(
        &self,
        a: i32,
        b: i32,
        callback: Option<AsyncCallback>,
        state: Option<Value>,
    ) -> AsyncResult;
    fn end_sum(&self, handle: &AsyncResult) -> Result<i32, Fault>;
    fn concatenate(&self, a: String, b: String) -> Result<String, Fault>;
    fn do_lots(&self) -> Result<(), Fault>;
    fn reply_after(&self, ms: u64) -> BoxFuture<'static, Result<u64, Fault>>;
    fn fail(&self) -> Result<i32, Fault>;
    fn fail_async(&self) -> BoxFuture<'static, Result<i32, Fault>>;
    fn list_persons(&self) -> Result<Vec<Person>, Fault>;
    fn get_person(&self, id: i32) -> Result<Option<Person>, Fault>;
}

impl Contract for dyn TestService {
    const SERVICE_ID: &'static str = "svcproxy::tests::TestService";
}

impl ServiceContract for dyn TestService {
    fn describe(ops: &mut Operations<Self>) {
        ops.sync("Sum", |svc, (a, b): (i32, i32)| svc.sum(a, b))
            .future("SumAsync", |svc, (a, b): (i32, i32)| svc.sum_async(a, b))
            .begin("BeginSum", |svc, (a, b): (i32, i32), callback, state| {
                svc.begin_sum(a, b, callback, state)
            })
            .end("EndSum", |svc, handle| svc.end_sum(handle))
            .sync("Concatenate", |svc, (a, b): (String, String)| svc.concatenate(a, b))
            .sync("DoLots", |svc, (): ()| svc.do_lots())
            .future("ReplyAfter", |svc, (ms,): (u64,)| svc.reply_after(ms))
            .sync("Fail", |svc, (): ()| svc.fail())
            .future("FailAsync", |svc, (): ()| svc.fail_async())
            .sync("ListPersons", |svc, (): ()| svc.list_persons())
            .sync("GetPerson", |svc, (id,): (i32,)| svc.get_person(id));
    }
}

pub struct TestServiceProxy {
    channel: ServiceChannel,
}

impl TestServiceProxy {
    pub fn channel(&self) -> &ServiceChannel {
        &self.channel
    }
}

impl TestService for TestServiceProxy {
    fn sum(&self, a: i32, b: i32) -> Result<i32, Fault> {
        self.channel.call("Sum", (a, b))
    }

    fn sum_async(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>> {
        self.channel.invoke("SumAsync", (a, b))
    }

    fn begin_sum(
        &self,
        a: i32,
        b: i32,
        callback: Option<AsyncCallback>,
        state: Option<Value>,
    ) -> AsyncResult {
        self.channel.begin("BeginSum", (a, b), callback, state)
    }

    fn end_sum(&self, handle: &AsyncResult) -> Result<i32, Fault> {
        self.channel.end(handle)
    }

    fn concatenate(&self, a: String, b: String) -> Result<String, Fault> {
        self.channel.call("Concatenate", (a, b))
    }

    fn do_lots(&self) -> Result<(), Fault> {
        self.channel.call("DoLots", ())
    }

    fn reply_after(&self, ms: u64) -> BoxFuture<'static, Result<u64, Fault>> {
        self.channel.invoke("ReplyAfter", (ms,))
    }

    fn fail(&self) -> Result<i32, Fault> {
        self.channel.call("Fail", ())
    }

    fn fail_async(&self) -> BoxFuture<'static, Result<i32, Fault>> {
        self.channel.invoke("FailAsync", ())
    }

    fn list_persons(&self) -> Result<Vec<Person>, Fault> {
        self.channel.call("ListPersons", ())
    }

    fn get_person(&self, id: i32) -> Result<Option<Person>, Fault> {
        self.channel.call("GetPerson", (id,))
    }
}

impl ClientContract for dyn TestService {
    type Proxy = TestServiceProxy;

    fn connect(channel: ServiceChannel) -> TestServiceProxy {
        TestServiceProxy { channel }
    }
}

pub struct TestServiceImpl;

impl TestService for TestServiceImpl {
    fn sum(&self, a: i32, b: i32) -> Result<i32, Fault> {
        Ok(a + b)
    }

    fn sum_async(&self, a: i32, b: i32) -> BoxFuture<'static, Result<i32, Fault>> {
        Box::pin(async move { Ok(a + b) })
    }

    fn begin_sum(
        &self,
        a: i32,
        b: i32,
        callback: Option<AsyncCallback>,
        state: Option<Value>,
    ) -> AsyncResult {
        AsyncResult::spawn(&Handle::current(), async move { Ok(json!(a + b)) }, callback, state)
    }

    fn end_sum(&self, handle: &AsyncResult) -> Result<i32, Fault> {
        serde_json::from_value(handle.wait()?).map_err(|e| Fault::from_error(&e))
    }

    fn concatenate(&self, a: String, b: String) -> Result<String, Fault> {
        Ok(a + &b)
    }

    fn do_lots(&self) -> Result<(), Fault> {
        std::thread::sleep(Duration::from_millis(10));
        Ok(())
    }

    fn reply_after(&self, ms: u64) -> BoxFuture<'static, Result<u64, Fault>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(ms)
        })
    }

    fn fail(&self) -> Result<i32, Fault> {
        Err(Fault::new("InvalidOperation", "it failed"))
    }

    fn fail_async(&self) -> BoxFuture<'static, Result<i32, Fault>> {
        Box::pin(async { Err(Fault::new("InvalidOperation", "it failed asynchronously")) })
    }

    fn list_persons(&self) -> Result<Vec<Person>, Fault> {
        Ok((0..PERSONS as u32).map(Person::numbered).collect())
    }

    fn get_person(&self, id: i32) -> Result<Option<Person>, Fault> {
        if id < 0 || id as usize >= PERSONS {
            return Ok(None);
        }
        Ok(Some(Person::numbered(id as u32)))
    }
}

pub fn service_factory() -> Arc<ServiceFactory> {
    let instances = Instances::new()
        .with::<dyn TestService, _>(|| Arc::new(TestServiceImpl) as Arc<dyn TestService>);
    let factory = ServiceFactory::new(instances);
    factory.bind::<dyn TestService>().unwrap();
    Arc::new(factory)
}

/// A running client/server pair over one binding.
///
/// Holds the binding's servers and broker alive for as long as the proxy
/// factory is used.
pub struct Harness {
    pub clients: ServiceClientFactory,
    _parts: Vec<Box<dyn Any>>,
}

impl Harness {
    pub fn service(&self) -> Arc<TestServiceProxy> {
        self.clients.client::<dyn TestService>()
    }
}

fn client_factory(client: impl Client + 'static, timeout: Option<Duration>) -> ServiceClientFactory {
    match timeout {
        Some(timeout) => ServiceClientFactory::with_timeout(client, timeout).unwrap(),
        None => ServiceClientFactory::new(client).unwrap(),
    }
}

/// In-process binding.
pub fn local_binding(timeout: Option<Duration>) -> Harness {
    Harness {
        clients: client_factory(LocalClient::new(service_factory()), timeout),
        _parts: Vec::new(),
    }
}

/// Broker-routed ZeroMQ binding over `inproc://` sockets.
pub fn zmq_binding(timeout: Option<Duration>) -> Harness {
    let context = zmq::Context::new();
    let config = BrokerConfig::inproc("end-to-end");

    let broker = ZmqBroker::new(&context, config.clone());
    broker.listen().unwrap();

    let server = ZmqServer::new(&context, config.server_config(), service_factory());
    server.listen().unwrap();

    let client = ZmqClient::new(&context, config.client_config()).unwrap();
    Harness {
        clients: client_factory(client, timeout),
        _parts: vec![Box::new(server), Box::new(broker), Box::new(context)],
    }
}

/// List-queue binding over an in-process store.
pub fn queue_binding(timeout: Option<Duration>) -> Harness {
    let store = Arc::new(MemoryStore::new());

    let server = QueueServer::new(
        Arc::clone(&store),
        QueueServerConfig::new("test-service"),
        service_factory(),
    );
    server.listen().unwrap();

    let client = QueueClient::new(Arc::clone(&store), QueueClientConfig::new("test-service")).unwrap();
    Harness {
        clients: client_factory(client, timeout),
        _parts: vec![Box::new(server)],
    }
}
