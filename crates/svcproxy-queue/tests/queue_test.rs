//! End-to-end tests for the queue binding over an in-process store.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use svcproxy_common::transport::{Client, Codec};
use svcproxy_common::{Contract, Fault, RequestData, ResponseData, RpcError};
use svcproxy_queue::{
    ListStore, MemoryStore, QueueClient, QueueClientConfig, QueueServer, QueueServerConfig,
};
use svcproxy_server::{Instances, Operations, ServiceContract, ServiceFactory};

const SERVICE: &str = "svcproxy::queue::tests::Calculator";
const QUEUE: &str = "calculator";

trait Calculator: Send + Sync {
    fn sum(&self, a: i64, b: i64) -> i64;
    fn fail(&self) -> Result<i64, Fault>;
}

impl Contract for dyn Calculator {
    const SERVICE_ID: &'static str = SERVICE;
}

impl ServiceContract for dyn Calculator {
    fn describe(ops: &mut Operations<Self>) {
        ops.sync("Sum", |svc, (a, b): (i64, i64)| Ok(svc.sum(a, b)))
            .future("ReplyAfter", |_svc, (ms,): (u64,)| async move {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(ms)
            })
            .sync("Fail", |svc, (): ()| svc.fail());
    }
}

#[derive(Default)]
struct CountingCalculator {
    calls: AtomicUsize,
}

impl Calculator for CountingCalculator {
    fn sum(&self, a: i64, b: i64) -> i64 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        a + b
    }

    fn fail(&self) -> Result<i64, Fault> {
        Err(Fault::new("Boom", "it failed"))
    }
}

fn calculator_factory() -> (Arc<ServiceFactory>, Arc<CountingCalculator>) {
    let calculator = Arc::new(CountingCalculator::default());
    let factory = ServiceFactory::new(
        Instances::new().with_instance::<dyn Calculator>(calculator.clone() as Arc<dyn Calculator>),
    );
    factory.bind::<dyn Calculator>().unwrap();
    (Arc::new(factory), calculator)
}

fn start_server(store: &Arc<MemoryStore>, codec: Codec) -> (QueueServer, Arc<CountingCalculator>) {
    let (factory, calculator) = calculator_factory();
    let mut config = QueueServerConfig::new(QUEUE);
    config.codec = codec;
    let server = QueueServer::new(Arc::clone(store), config, factory);
    server.listen().unwrap();
    (server, calculator)
}

fn client(store: &Arc<MemoryStore>, codec: Codec) -> QueueClient {
    let mut config = QueueClientConfig::new(QUEUE);
    config.codec = codec;
    QueueClient::new(Arc::clone(store), config).unwrap()
}

fn sum(a: i64, b: i64) -> RequestData {
    RequestData::new(SERVICE, "Sum", vec![json!(a), json!(b)])
}

// ============================================================================
// Round trips
// ============================================================================

#[tokio::test]
async fn test_round_trip_through_queue() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::Json);
    let client = client(&store, Codec::Json);

    let response = client.request(sum(1, 2), CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::data(json!(3)));
    assert_eq!(client.in_flight(), 0);
    assert!(store.is_empty(QUEUE));
    assert!(store.is_empty(client.receive_queue()));
}

#[tokio::test]
async fn test_message_pack_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::MessagePack);
    let client = client(&store, Codec::MessagePack);

    let response = client.request(sum(40, 2), CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::data(json!(42)));
}

#[tokio::test]
async fn test_remote_fault_is_preserved() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::Json);
    let client = client(&store, Codec::Json);

    let request = RequestData::new(SERVICE, "Fail", vec![]);
    let response = client.request(request, CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::fault(Fault::new("Boom", "it failed")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_requests_are_correlated() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::Json);
    let client = client(&store, Codec::Json);

    let calls = (0..100).map(|i| client.request(sum(i, i), CancellationToken::new()));
    for (i, response) in join_all(calls).await.into_iter().enumerate() {
        assert_eq!(response.unwrap(), ResponseData::data(json!(2 * i)));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clients_get_their_own_replies() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::Json);
    let first = client(&store, Codec::Json);
    let second = client(&store, Codec::Json);

    let (a, b) = tokio::join!(
        first.request(sum(1, 1), CancellationToken::new()),
        second.request(sum(10, 10), CancellationToken::new()),
    );
    assert_eq!(a.unwrap(), ResponseData::data(json!(2)));
    assert_eq!(b.unwrap(), ResponseData::data(json!(20)));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_servers_share_a_queue() {
    let store = Arc::new(MemoryStore::new());
    let (_first, first) = start_server(&store, Codec::Json);
    let (_second, second) = start_server(&store, Codec::Json);
    let client = client(&store, Codec::Json);

    let calls = (0..1_000).map(|i| client.request(sum(i, 1), CancellationToken::new()));
    for (i, response) in join_all(calls).await.into_iter().enumerate() {
        assert_eq!(response.unwrap(), ResponseData::data(json!(i + 1)));
    }

    let served = first.calls.load(Ordering::Relaxed) + second.calls.load(Ordering::Relaxed);
    assert_eq!(served, 1_000);
}

// ============================================================================
// Failure paths
// ============================================================================

#[tokio::test]
async fn test_cancellation_frees_pending_slot() {
    let store = Arc::new(MemoryStore::new());
    let (_server, _) = start_server(&store, Codec::Json);
    let client = Arc::new(client(&store, Codec::Json));
    let cancel = CancellationToken::new();

    let call = {
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        let request = RequestData::new(SERVICE, "ReplyAfter", vec![json!(300)]);
        tokio::spawn(async move { client.request(request, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.in_flight(), 1);

    cancel.cancel();
    assert!(matches!(call.await.unwrap(), Err(RpcError::Cancelled)));
    assert_eq!(client.in_flight(), 0);

    // The late reply is discarded and the client keeps working.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let response = client.request(sum(2, 2), CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::data(json!(4)));
}

#[tokio::test]
async fn test_unanswered_request_waits_until_cancelled() {
    // No server: the request sits in the queue.
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(client(&store, Codec::Json));
    let cancel = CancellationToken::new();

    let call = {
        let client = Arc::clone(&client);
        let cancel = cancel.clone();
        tokio::spawn(async move { client.request(sum(1, 1), cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.len(QUEUE), 1);

    cancel.cancel();
    assert!(matches!(call.await.unwrap(), Err(RpcError::Cancelled)));
    assert_eq!(client.in_flight(), 0);
}

struct BrokenStore;

#[async_trait]
impl ListStore for BrokenStore {
    async fn push_head(&self, _queue: &str, _item: Vec<u8>) -> svcproxy_common::Result<()> {
        Err(RpcError::Transport("connection refused".into()))
    }

    async fn pop_tail(&self, _queue: &str) -> svcproxy_common::Result<Option<Vec<u8>>> {
        Err(RpcError::Transport("connection refused".into()))
    }
}

#[tokio::test]
async fn test_push_failure_is_reported() {
    let client = QueueClient::new(BrokenStore, QueueClientConfig::new(QUEUE)).unwrap();

    let result = client.request(sum(1, 1), CancellationToken::new()).await;
    assert!(matches!(result, Err(RpcError::Transport(_))));
    assert_eq!(client.in_flight(), 0);
}

/// Fails the first `failures` pops, then behaves like the wrapped store.
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failures: AtomicUsize,
    failed: Arc<AtomicUsize>,
}

impl FlakyStore {
    fn new(inner: &Arc<MemoryStore>, failures: usize) -> (Self, Arc<AtomicUsize>) {
        let failed = Arc::new(AtomicUsize::new(0));
        let store = FlakyStore {
            inner: Arc::clone(inner),
            failures: AtomicUsize::new(failures),
            failed: Arc::clone(&failed),
        };
        (store, failed)
    }
}

#[async_trait]
impl ListStore for FlakyStore {
    async fn push_head(&self, queue: &str, item: Vec<u8>) -> svcproxy_common::Result<()> {
        self.inner.push_head(queue, item).await
    }

    async fn pop_tail(&self, queue: &str) -> svcproxy_common::Result<Option<Vec<u8>>> {
        let remaining = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            self.failed.fetch_add(1, Ordering::SeqCst);
            return Err(RpcError::Transport("connection reset".into()));
        }
        self.inner.pop_tail(queue).await
    }
}

#[tokio::test]
async fn test_receive_loops_survive_store_errors() {
    let store = Arc::new(MemoryStore::new());

    let (server_store, server_failed) = FlakyStore::new(&store, 3);
    let (factory, calculator) = calculator_factory();
    let server = QueueServer::new(server_store, QueueServerConfig::new(QUEUE), factory);
    server.listen().unwrap();

    let (client_store, client_failed) = FlakyStore::new(&store, 3);
    let client = QueueClient::new(client_store, QueueClientConfig::new(QUEUE)).unwrap();

    let response = client.request(sum(5, 6), CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::data(json!(11)));
    assert_eq!(calculator.calls.load(Ordering::Relaxed), 1);
    assert_eq!(server_failed.load(Ordering::SeqCst), 3);
    assert_eq!(client_failed.load(Ordering::SeqCst), 3);
    assert!(server.is_listening());

    // Both loops keep serving after recovering.
    let response = client.request(sum(1, 1), CancellationToken::new()).await.unwrap();
    assert_eq!(response, ResponseData::data(json!(2)));
}

#[tokio::test]
async fn test_reply_queue_name_is_validated() {
    let mut config = QueueClientConfig::new(QUEUE);
    config.receive_queue = "replies:1".into();
    assert!(matches!(
        QueueClient::new(MemoryStore::new(), config),
        Err(RpcError::InvalidFrame(_))
    ));
}

#[tokio::test]
async fn test_shutdown_fails_in_flight_requests() {
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(client(&store, Codec::Json));

    let call = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.request(sum(1, 1), CancellationToken::new()).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    client.shutdown().await;

    assert!(matches!(call.await.unwrap(), Err(RpcError::ShutDown)));
    let after = client.request(sum(1, 1), CancellationToken::new()).await;
    assert!(matches!(after, Err(RpcError::ShutDown)));
}

#[tokio::test]
async fn test_server_stops_popping_after_shutdown() {
    let store = Arc::new(MemoryStore::new());
    let (server, calculator) = start_server(&store, Codec::Json);
    assert!(server.is_listening());

    server.shutdown().await;
    assert!(!server.is_listening());
    assert!(matches!(server.listen(), Err(RpcError::ShutDown)));

    let client = client(&store, Codec::Json);
    let cancel = CancellationToken::new();
    let pending = client.request(sum(1, 1), cancel.clone());
    let outcome = tokio::time::timeout(Duration::from_millis(100), pending).await;
    assert!(outcome.is_err());
    assert_eq!(store.len(QUEUE), 1);
    assert_eq!(calculator.calls.load(Ordering::Relaxed), 0);
}
