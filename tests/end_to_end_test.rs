//! svcproxy End-to-End Tests
//!
//! Drives the same test service through every binding: in-process, ZeroMQ
//! through a broker, and list queues. Each binding must give callers
//! identical results, faults, correlation, timeout and cancellation
//! behaviour.

mod common;

use common::{Harness, Person, TestService, PERSONS};
use futures::future::join_all;
use serde_json::json;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use svcproxy::{AsyncCallback, AsyncResult, Fault};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Scenarios
// ============================================================================

async fn round_trip(harness: Harness) {
    let service = harness.service();
    assert_eq!(service.sum_async(1, 2).await, Ok(3));

    let blocking = harness.service();
    let (sum, joined, unit) = tokio::task::spawn_blocking(move || {
        (
            blocking.sum(20, 22),
            blocking.concatenate("svc".into(), "proxy".into()),
            blocking.do_lots(),
        )
    })
    .await
    .unwrap();

    assert_eq!(sum, Ok(42));
    assert_eq!(joined, Ok("svcproxy".to_string()));
    assert_eq!(unit, Ok(()));
}

async fn begin_end(harness: Harness) {
    let service = harness.service();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let callback: AsyncCallback = std::sync::Arc::new(move |handle: &AsyncResult| {
        let _ = tx.lock().unwrap().send(handle.async_state().cloned());
    });

    let result = tokio::task::spawn_blocking(move || {
        let handle = service.begin_sum(3, 4, Some(callback), Some(json!({ "caller": 1 })));
        service.end_sum(&handle)
    })
    .await
    .unwrap();

    assert_eq!(result, Ok(7));
    let state = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(state, Some(json!({ "caller": 1 })));
}

async fn fault_fidelity(harness: Harness) {
    let service = harness.service();
    assert_eq!(
        service.fail_async().await,
        Err(Fault::new("InvalidOperation", "it failed asynchronously"))
    );

    let blocking = harness.service();
    let result = tokio::task::spawn_blocking(move || blocking.fail()).await.unwrap();
    assert_eq!(result, Err(Fault::new("InvalidOperation", "it failed")));
}

async fn correlation(harness: Harness) {
    let service = harness.service();
    let calls = (0..100).map(|i| service.sum_async(i, i));
    for (i, result) in join_all(calls).await.into_iter().enumerate() {
        assert_eq!(result, Ok(2 * i as i32));
    }
}

async fn sequences_and_nulls(harness: Harness) {
    let service = harness.service();
    let (persons, third, missing) = tokio::task::spawn_blocking(move || {
        (service.list_persons(), service.get_person(3), service.get_person(-1))
    })
    .await
    .unwrap();

    let persons = persons.unwrap();
    assert_eq!(persons.len(), PERSONS);
    assert_eq!(persons[9], Person::numbered(9));
    assert_eq!(third, Ok(Some(Person { name: "Person 3".into(), age: 30 })));
    assert_eq!(missing, Ok(None));
}

async fn timeout(harness: Harness) {
    let service = harness.service();

    let started = Instant::now();
    let late = service.reply_after(1_000).await;
    assert!(matches!(&late, Err(fault) if fault.is_timeout()), "got {:?}", late);
    assert!(started.elapsed() < Duration::from_millis(900));

    assert_eq!(service.reply_after(0).await, Ok(0));
}

async fn cancellation(harness: Harness) {
    let service = harness.service();
    let cancel = CancellationToken::new();
    let call = service
        .channel()
        .invoke_with::<_, u64>("ReplyAfter", (500u64,), cancel.clone());

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let result = call.await;
    canceller.await.unwrap();
    assert!(matches!(&result, Err(fault) if fault.is_cancelled()), "got {:?}", result);

    // The binding keeps serving after a cancelled call.
    assert_eq!(service.sum_async(5, 5).await, Ok(10));
}

// ============================================================================
// Bindings
// ============================================================================

macro_rules! binding_tests {
    ($binding:ident, $connect:path) => {
        mod $binding {
            use super::*;

            #[tokio::test(flavor = "multi_thread")]
            async fn test_round_trip() {
                round_trip($connect(None)).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_begin_end() {
                begin_end($connect(None)).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_fault_fidelity() {
                fault_fidelity($connect(None)).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_concurrent_calls_are_correlated() {
                correlation($connect(None)).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_sequences_and_nulls() {
                sequences_and_nulls($connect(None)).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_timeout() {
                timeout($connect(Some(Duration::from_millis(50)))).await;
            }

            #[tokio::test(flavor = "multi_thread")]
            async fn test_cancellation() {
                cancellation($connect(None)).await;
            }
        }
    };
}

binding_tests!(local, common::local_binding);
binding_tests!(zmq_broker, common::zmq_binding);
binding_tests!(list_queue, common::queue_binding);
