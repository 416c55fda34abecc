//! Zipping: pair up corresponding elements of two streams
//!
//! [`zip_serial`] pulls one element from each side in turn. [`zip_async`] runs both
//! sides as producer tasks feeding single-slot channels, so the next pair is being
//! produced while the current one is consumed. Both stop as soon as either side
//! is exhausted.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StreamResult;
use crate::policy::{Policy, PolicyKind};

use super::core::Stream;
use super::node::Node;

/// Pair elements by position, pulling `a` then `b` for every pair.
pub fn zip_serial<A, B, C, P, F>(a: Stream<A, P>, b: Stream<B, P>, f: F) -> Stream<C, P>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    P: Policy,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    let (left, config) = a.into_parts();
    Stream::from_parts(zip_serial_node(left, b.node, Arc::new(f)), config)
}

/// Pair elements by position, producing both sides concurrently.
pub fn zip_async<A, B, C, P, F>(a: Stream<A, P>, b: Stream<B, P>, f: F) -> Stream<C, P>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    P: Policy,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    let (left, config) = a.into_parts();
    let right = b.node;
    let f = Arc::new(f);
    let node = Node::lazy(move || ZipChannel::launch(left, right).into_node(f));
    Stream::from_parts(node, config)
}

impl<A: Send + 'static, P: Policy> Stream<A, P> {
    /// Zip with `other` the way the policy designates: concurrently for
    /// `ZipAsync`, serially for every other policy.
    pub fn zip_with<B, C, F>(self, other: Stream<B, P>, f: F) -> Stream<C, P>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        match P::KIND {
            PolicyKind::ZipAsync => zip_async(self, other, f),
            _ => zip_serial(self, other, f),
        }
    }

    /// Zip into pairs.
    pub fn zip<B: Send + 'static>(self, other: Stream<B, P>) -> Stream<(A, B), P> {
        self.zip_with(other, |a, b| (a, b))
    }
}

fn zip_serial_node<A, B, C, F>(left: Node<A>, right: Node<B>, f: Arc<F>) -> Node<C>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    F: Fn(A, B) -> C + Send + Sync + 'static,
{
    Node::defer(move || async move {
        let (a, left) = match left.uncons().await? {
            Some(pair) => pair,
            None => return Ok(Node::Nil),
        };
        let (b, right) = match right.uncons().await? {
            Some(pair) => pair,
            None => return Ok(Node::Nil),
        };
        Ok(Node::cons(f(a, b), zip_serial_node(left, right, f)))
    })
}

/// Two producer tasks and the single-slot channels they feed.
struct ZipChannel<A, B> {
    left: mpsc::Receiver<StreamResult<A>>,
    right: mpsc::Receiver<StreamResult<B>>,
    producers: [JoinHandle<()>; 2],
}

impl<A: Send + 'static, B: Send + 'static> ZipChannel<A, B> {
    fn launch(left: Node<A>, right: Node<B>) -> Self {
        let (left_tx, left_rx) = mpsc::channel(1);
        let (right_tx, right_rx) = mpsc::channel(1);
        debug!("Starting zip producers");
        Self {
            left: left_rx,
            right: right_rx,
            producers: [
                tokio::spawn(produce(left, left_tx)),
                tokio::spawn(produce(right, right_tx)),
            ],
        }
    }

    /// Node yielding one combined pair per pull until either side ends.
    ///
    /// Whichever side ends or fails first decides the pull; the other side is
    /// not waited for.
    fn into_node<C, F>(mut self, f: Arc<F>) -> Node<C>
    where
        C: Send + 'static,
        F: Fn(A, B) -> C + Send + Sync + 'static,
    {
        Node::defer(move || async move {
            let (mut a, mut b) = (None, None);
            while a.is_none() || b.is_none() {
                tokio::select! {
                    item = self.left.recv(), if a.is_none() => match item {
                        Some(Ok(value)) => a = Some(value),
                        Some(Err(err)) => return Err(err),
                        None => return Ok(Node::Nil),
                    },
                    item = self.right.recv(), if b.is_none() => match item {
                        Some(Ok(value)) => b = Some(value),
                        Some(Err(err)) => return Err(err),
                        None => return Ok(Node::Nil),
                    },
                }
            }
            match (a, b) {
                (Some(a), Some(b)) => {
                    let value = f(a, b);
                    Ok(Node::cons(value, self.into_node(f)))
                }
                _ => Ok(Node::Nil),
            }
        })
    }
}

impl<A, B> Drop for ZipChannel<A, B> {
    fn drop(&mut self) {
        for producer in &self.producers {
            producer.abort();
        }
    }
}

async fn produce<T: Send + 'static>(mut node: Node<T>, tx: mpsc::Sender<StreamResult<T>>) {
    loop {
        match node.uncons().await {
            Ok(Some((value, rest))) => {
                if tx.send(Ok(value)).await.is_err() {
                    return;
                }
                node = rest;
            }
            Ok(None) => return,
            Err(err) => {
                let _ = tx.send(Err(err)).await;
                return;
            }
        }
    }
}
