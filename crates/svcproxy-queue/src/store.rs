//! List stores
//!
//! The queue binding needs exactly two operations from its backing store:
//! push an item onto the head of a named list and pop one from its tail.
//! Together they make each list a FIFO queue that any number of producers
//! and consumers can share.

use async_trait::async_trait;
use dashmap::DashMap;
use redis::AsyncCommands;
use std::collections::VecDeque;
use std::sync::Arc;

use svcproxy_common::{Result, RpcError};

use crate::config::RedisConfig;

/// A store of named FIFO lists.
#[async_trait]
pub trait ListStore: Send + Sync + 'static {
    /// Pushes `item` onto the head of `queue`.
    async fn push_head(&self, queue: &str, item: Vec<u8>) -> Result<()>;

    /// Pops the oldest item of `queue`, if any. Never blocks waiting for one.
    async fn pop_tail(&self, queue: &str) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
impl<S: ListStore + ?Sized> ListStore for Arc<S> {
    async fn push_head(&self, queue: &str, item: Vec<u8>) -> Result<()> {
        (**self).push_head(queue, item).await
    }

    async fn pop_tail(&self, queue: &str) -> Result<Option<Vec<u8>>> {
        (**self).pop_tail(queue).await
    }
}

fn transport(err: redis::RedisError) -> RpcError {
    RpcError::Transport(err.to_string())
}

/// Redis-backed store (LPUSH / RPOP).
///
/// Holds one multiplexed connection; clones of it share the socket, so a
/// single store serves any number of concurrent callers.
#[derive(Clone)]
pub struct RedisStore {
    connection: redis::aio::MultiplexedConnection,
}

impl RedisStore {
    /// Connects to the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the server cannot be reached or rejects the credentials.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.connection_info()).map_err(transport)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(transport)?;
        tracing::info!(host = %config.host, port = config.port, "connected to redis");
        Ok(RedisStore { connection })
    }
}

#[async_trait]
impl ListStore for RedisStore {
    async fn push_head(&self, queue: &str, item: Vec<u8>) -> Result<()> {
        let mut connection = self.connection.clone();
        connection
            .lpush::<_, _, ()>(queue, item)
            .await
            .map_err(transport)
    }

    async fn pop_tail(&self, queue: &str) -> Result<Option<Vec<u8>>> {
        let mut connection = self.connection.clone();
        connection
            .rpop::<_, Option<Vec<u8>>>(queue, None)
            .await
            .map_err(transport)
    }
}

/// In-process store with the same semantics, for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    queues: DashMap<String, VecDeque<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items waiting in `queue`.
    pub fn len(&self, queue: &str) -> usize {
        self.queues.get(queue).map_or(0, |items| items.len())
    }

    pub fn is_empty(&self, queue: &str) -> bool {
        self.len(queue) == 0
    }
}

#[async_trait]
impl ListStore for MemoryStore {
    async fn push_head(&self, queue: &str, item: Vec<u8>) -> Result<()> {
        self.queues.entry(queue.to_string()).or_default().push_front(item);
        Ok(())
    }

    async fn pop_tail(&self, queue: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.queues.get_mut(queue).and_then(|mut items| items.pop_back()))
    }
}
