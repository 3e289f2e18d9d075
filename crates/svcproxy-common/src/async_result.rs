//! Pending-operation handle for the begin/end calling convention.
//!
//! A `Begin<Name>` call hands back an [`AsyncResult`] right away; the matching
//! `End<Name>` call takes the handle and blocks until it settles. The handle
//! settles exactly once and is cheap to clone, so the callback, the caller and
//! the `End` side can all hold it at the same time.

use futures::FutureExt;
use parking_lot::{Condvar, Mutex};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::protocol::Fault;

/// Settled value of an [`AsyncResult`].
pub type Outcome = std::result::Result<Value, Fault>;

/// Completion callback handed to `Begin<Name>` operations.
pub type AsyncCallback = Arc<dyn Fn(&AsyncResult) + Send + Sync>;

/// Handle to an operation started with `Begin<Name>`.
///
/// # Example
///
/// ```
/// use svcproxy_common::AsyncResult;
/// use serde_json::json;
///
/// let handle = AsyncResult::pending(Some(json!("state")));
/// assert!(!handle.is_completed());
///
/// assert!(handle.complete(Ok(json!(3))));
/// assert!(!handle.complete(Ok(json!(4))));
/// assert_eq!(handle.wait(), Ok(json!(3)));
/// assert_eq!(handle.async_state(), Some(&json!("state")));
/// ```
#[derive(Clone)]
pub struct AsyncResult {
    inner: Arc<Inner>,
}

struct Inner {
    state: Option<Value>,
    outcome: Mutex<Option<Outcome>>,
    ready: Condvar,
    notify: Notify,
}

impl AsyncResult {
    /// Creates a handle that has not settled yet.
    pub fn pending(state: Option<Value>) -> Self {
        AsyncResult {
            inner: Arc::new(Inner {
                state,
                outcome: Mutex::new(None),
                ready: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Creates a handle that is already settled.
    pub fn completed(outcome: Outcome, state: Option<Value>) -> Self {
        let handle = AsyncResult::pending(state);
        handle.complete(outcome);
        handle
    }

    /// Runs `future` on `runtime` and settles the returned handle with its output.
    ///
    /// The callback, if any, runs after the handle has settled, so calling
    /// [`wait`](Self::wait) from inside it never blocks. A panic inside the
    /// future settles the handle with a `Panic` fault.
    pub fn spawn<F>(
        runtime: &Handle,
        future: F,
        callback: Option<AsyncCallback>,
        state: Option<Value>,
    ) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        let handle = AsyncResult::pending(state);
        let completion = handle.clone();

        runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => Err(Fault::from_panic(&*panic)),
            };
            completion.complete(outcome);

            if let Some(callback) = callback {
                callback(&completion);
            }
        });

        handle
    }

    /// Caller-supplied state passed to `Begin<Name>`.
    pub fn async_state(&self) -> Option<&Value> {
        self.inner.state.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.inner.outcome.lock().is_some()
    }

    /// Settles the handle. Returns `false` if it had already settled.
    pub fn complete(&self, outcome: Outcome) -> bool {
        {
            let mut slot = self.inner.outcome.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
        }

        self.inner.ready.notify_all();
        self.inner.notify.notify_waiters();
        true
    }

    /// Returns the outcome if the handle has settled.
    pub fn try_outcome(&self) -> Option<Outcome> {
        self.inner.outcome.lock().clone()
    }

    /// Blocks the current thread until the handle settles.
    ///
    /// Must not be called from an async task; use [`settled`](Self::settled) there.
    pub fn wait(&self) -> Outcome {
        let mut slot = self.inner.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.inner.ready.wait(&mut slot);
        }
    }

    /// Waits asynchronously until the handle settles.
    pub async fn settled(&self) -> Outcome {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(outcome) = self.try_outcome() {
                return outcome;
            }
            notified.await;
        }
    }
}

impl fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("state", &self.inner.state)
            .field("completed", &self.is_completed())
            .finish()
    }
}
