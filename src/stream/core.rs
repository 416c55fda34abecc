//! The policy-tagged stream type

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::error::StreamResult;
use crate::policy::{Async, Interleaved, Parallel, Policy, PolicyKind, Serial, ZipAsync, ZipSerial};

use super::node::Node;

/// A lazily produced sequence of `T` whose composition discipline is `P`.
///
/// The policy only decides how streams are combined ([`append`](Stream::append),
/// [`bind`](Stream::bind), [`zip_with`](Stream::zip_with)) and scheduled. A single
/// stream produces its elements the same way under every policy, so a program
/// written generically over `P` can be run serially, interleaved, concurrently or
/// in parallel by changing one type.
///
/// A stream is consumed by running it. Concurrent compositions need a tokio
/// runtime.
pub struct Stream<T, P = Serial> {
    pub(crate) node: Node<T>,
    pub(crate) config: Arc<SchedulerConfig>,
    _policy: PhantomData<fn() -> P>,
}

pub type SerialStream<T> = Stream<T, Serial>;
pub type InterleavedStream<T> = Stream<T, Interleaved>;
pub type AsyncStream<T> = Stream<T, Async>;
pub type ParallelStream<T> = Stream<T, Parallel>;
pub type ZipSerialStream<T> = Stream<T, ZipSerial>;
pub type ZipAsyncStream<T> = Stream<T, ZipAsync>;

impl<T, P: Policy> fmt::Debug for Stream<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("policy", &P::KIND)
            .field("node", &self.node)
            .finish()
    }
}

impl<T: Send + 'static, P: Policy> Default for Stream<T, P> {
    fn default() -> Self {
        Self::from_node(Node::Nil)
    }
}

impl<T: Send + 'static, P: Policy> Stream<T, P> {
    pub(crate) fn from_node(node: Node<T>) -> Self {
        Self::from_parts(node, Arc::new(SchedulerConfig::default()))
    }

    pub(crate) fn from_parts(node: Node<T>, config: Arc<SchedulerConfig>) -> Self {
        Self {
            node,
            config,
            _policy: PhantomData,
        }
    }

    pub(crate) fn into_parts(self) -> (Node<T>, Arc<SchedulerConfig>) {
        (self.node, self.config)
    }

    /// Runtime name of this stream's policy
    pub fn policy(&self) -> PolicyKind {
        P::KIND
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Split off the first element. This is the only extraction primitive; every
    /// runner is written against it.
    pub async fn uncons(self) -> StreamResult<Option<(T, Self)>> {
        let config = self.config;
        Ok(self
            .node
            .uncons()
            .await?
            .map(|(head, rest)| (head, Self::from_parts(rest, config))))
    }

    // ================================
    // Policy adapters
    // ================================

    /// Reinterpret the stream under another policy. Values are untouched.
    pub fn adapt<Q: Policy>(self) -> Stream<T, Q> {
        Stream::from_parts(self.node, self.config)
    }

    pub fn as_serial(self) -> Stream<T, Serial> {
        self.adapt()
    }

    pub fn as_interleaved(self) -> Stream<T, Interleaved> {
        self.adapt()
    }

    pub fn as_async(self) -> Stream<T, Async> {
        self.adapt()
    }

    pub fn as_parallel(self) -> Stream<T, Parallel> {
        self.adapt()
    }

    pub fn as_zip_serial(self) -> Stream<T, ZipSerial> {
        self.adapt()
    }

    pub fn as_zip_async(self) -> Stream<T, ZipAsync> {
        self.adapt()
    }

    // ================================
    // Scheduler configuration
    // ================================

    /// Use `config` for the concurrent compositions built from this stream.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    fn update_config(mut self, f: impl FnOnce(&mut SchedulerConfig)) -> Self {
        f(Arc::make_mut(&mut self.config));
        self
    }

    pub fn max_workers(self, n: usize) -> Self {
        self.update_config(|config| config.max_workers = n)
    }

    pub fn max_parallel_workers(self, n: usize) -> Self {
        self.update_config(|config| config.max_parallel_workers = n)
    }

    pub fn buffer_size(self, n: usize) -> Self {
        self.update_config(|config| config.buffer_size = n)
    }

    pub fn fork_threshold(self, n: usize) -> Self {
        self.update_config(|config| config.fork_threshold = n)
    }

    // ================================
    // Transformations
    // ================================

    /// Apply `f` to every element.
    pub fn map<U, F>(self, f: F) -> Stream<U, P>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let (node, config) = self.into_parts();
        Stream::from_parts(map_node(node, Arc::new(f)), config)
    }

    /// Apply an effectful `f` to every element, one at a time.
    pub fn map_m<U, F, Fut>(self, f: F) -> Stream<U, P>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StreamResult<U>> + Send + 'static,
    {
        let (node, config) = self.into_parts();
        Stream::from_parts(map_m_node(node, Arc::new(f)), config)
    }

    /// Keep the elements matching `predicate`.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (node, config) = self.into_parts();
        Self::from_parts(filter_node(node, Arc::new(predicate)), config)
    }

    /// Take at most `n` elements. The rest of the stream is dropped, which stops
    /// any workers still producing it.
    pub fn take(self, n: usize) -> Self {
        let (node, config) = self.into_parts();
        Self::from_parts(take_node(node, n), config)
    }

    /// Fail with [`StreamError::Timeout`](crate::error::StreamError::Timeout) when producing the next element takes
    /// longer than `duration`. The late step is dropped.
    pub fn timeout(self, duration: Duration) -> Self {
        let (node, config) = self.into_parts();
        Self::from_parts(timeout_node(node, duration), config)
    }
}

fn map_node<T, U, F>(node: Node<T>, f: Arc<F>) -> Node<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
{
    Node::defer(move || async move {
        Ok(match node.uncons().await? {
            Some((head, rest)) => Node::cons(f(head), map_node(rest, f)),
            None => Node::Nil,
        })
    })
}

fn map_m_node<T, U, F, Fut>(node: Node<T>, f: Arc<F>) -> Node<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<U>> + Send + 'static,
{
    Node::defer(move || async move {
        Ok(match node.uncons().await? {
            Some((head, rest)) => Node::cons(f(head).await?, map_m_node(rest, f)),
            None => Node::Nil,
        })
    })
}

fn filter_node<T, F>(node: Node<T>, predicate: Arc<F>) -> Node<T>
where
    T: Send + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Node::defer(move || async move {
        let mut node = node;
        while let Some((head, rest)) = node.uncons().await? {
            if predicate(&head) {
                return Ok(Node::cons(head, filter_node(rest, predicate)));
            }
            node = rest;
        }
        Ok(Node::Nil)
    })
}

fn take_node<T: Send + 'static>(node: Node<T>, n: usize) -> Node<T> {
    if n == 0 {
        return Node::Nil;
    }
    Node::defer(move || async move {
        Ok(match node.uncons().await? {
            Some((head, rest)) => Node::cons(head, take_node(rest, n - 1)),
            None => Node::Nil,
        })
    })
}

fn timeout_node<T: Send + 'static>(node: Node<T>, duration: Duration) -> Node<T> {
    Node::defer(move || async move {
        let head = tokio::time::timeout(duration, node.uncons()).await??;
        Ok(match head {
            Some((value, rest)) => Node::cons(value, timeout_node(rest, duration)),
            None => Node::Nil,
        })
    })
}
