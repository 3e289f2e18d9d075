use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use svcproxy_common::{Result, RpcError};

/// A set of named background threads sharing one running flag.
///
/// Socket loops block on ZeroMQ calls with a timeout and re-check the flag
/// after each one, so [`stop_and_join`](Self::stop_and_join) returns within
/// roughly one receive timeout.
#[derive(Debug)]
pub(crate) struct LoopSet {
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl LoopSet {
    pub(crate) fn new() -> Self {
        LoopSet {
            running: Arc::new(AtomicBool::new(true)),
            handles: Vec::new(),
        }
    }

    /// Shared flag the loops poll.
    pub(crate) fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn spawn<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|e| RpcError::Runtime(format!("failed to spawn {}: {}", name, e)))?;
        self.handles.push(handle);
        Ok(())
    }

    /// Clears the running flag and joins every loop.
    pub(crate) fn stop_and_join(&mut self) {
        self.running.store(false, Ordering::Release);
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("svcproxy-loop").to_string();
            if handle.join().is_err() {
                tracing::warn!(thread = %name, "socket loop panicked");
            }
        }
    }
}

impl Drop for LoopSet {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
