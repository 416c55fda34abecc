//! Binary composition operators
//!
//! | operator         | traversal | execution                      |
//! |------------------|-----------|--------------------------------|
//! | [`serial`]       | DFS       | one step at a time             |
//! | [`interleave`]   | BFS       | one step at a time             |
//! | [`async_append`] | DFS       | concurrent, forked on demand   |
//! | [`parallel`]     | BFS       | concurrent, forked immediately |
//!
//! Each operator accepts two streams of the same policy and returns a stream of
//! that policy. [`Stream::append`] picks the operator the policy designates.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::policy::{Policy, PolicyKind};

use super::core::Stream;
use super::node::{ForkMode, Node};

/// All of `a`, then all of `b`.
pub fn serial<T, P>(a: Stream<T, P>, b: Stream<T, P>) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    let (left, config) = a.into_parts();
    Stream::from_parts(Node::append(left, b.node), config)
}

/// `a1, b1, a2, b2, ...` followed by whatever is left of the longer side.
///
/// Both remainders are kept until exhausted, so interleaving with an infinite
/// stream never lets the other side finish.
pub fn interleave<T, P>(a: Stream<T, P>, b: Stream<T, P>) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    let (left, config) = a.into_parts();
    Stream::from_parts(Node::interleave(left, b.node), config)
}

/// Run `a`, forking `b` as a concurrent worker only when the consumer is not
/// kept busy by `a`. `a` is always started first.
pub fn async_append<T, P>(a: Stream<T, P>, b: Stream<T, P>) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    let (left, config) = a.into_parts();
    let node = Node::fork(ForkMode::Async, config.clone(), left, b.node);
    Stream::from_parts(node, config)
}

/// Run `a` and `b` concurrently right away, taking their values round-robin.
pub fn parallel<T, P>(a: Stream<T, P>, b: Stream<T, P>) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    let (left, config) = a.into_parts();
    let node = Node::fork(ForkMode::Parallel, config.clone(), left, b.node);
    Stream::from_parts(node, config)
}

impl<T: Send + 'static, P: Policy> Stream<T, P> {
    /// Compose with the operator of this stream's policy: `serial` for the serial
    /// and zip policies, `interleave`, `async_append` or `parallel` otherwise.
    pub fn append(self, other: Self) -> Self {
        let (left, config) = self.into_parts();
        let node = compose_node(P::KIND, left, other.node, &config);
        Stream::from_parts(node, config)
    }
}

/// Right fold of `streams` with `op`, starting from `empty()`.
///
/// `fold_with(async_append, streams)` runs a list of streams concurrently.
pub fn fold_with<T, P, I, F>(op: F, streams: I) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    I: IntoIterator<Item = Stream<T, P>>,
    I::IntoIter: DoubleEndedIterator,
    F: Fn(Stream<T, P>, Stream<T, P>) -> Stream<T, P>,
{
    streams
        .into_iter()
        .rev()
        .fold(Stream::default(), |acc, stream| op(stream, acc))
}

/// Map every item to a stream and combine the streams with `op`.
pub fn fold_map_with<T, P, A, I, F, G>(op: F, f: G, items: I) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    I: IntoIterator<Item = A>,
    I::IntoIter: DoubleEndedIterator,
    F: Fn(Stream<T, P>, Stream<T, P>) -> Stream<T, P>,
    G: Fn(A) -> Stream<T, P>,
{
    fold_with(op, items.into_iter().map(f))
}

pub(crate) fn compose_node<T: Send + 'static>(
    kind: PolicyKind,
    left: Node<T>,
    right: Node<T>,
    config: &Arc<SchedulerConfig>,
) -> Node<T> {
    match kind {
        PolicyKind::Serial | PolicyKind::ZipSerial | PolicyKind::ZipAsync => Node::append(left, right),
        PolicyKind::Interleaved => Node::interleave(left, right),
        PolicyKind::Async => Node::fork(ForkMode::Async, config.clone(), left, right),
        PolicyKind::Parallel => Node::fork(ForkMode::Parallel, config.clone(), left, right),
    }
}
