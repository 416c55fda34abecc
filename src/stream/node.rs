//! Suspended stream representation
//!
//! A [`Node`] is one of six shapes:
//!
//! - `Nil`: the stream is exhausted
//! - `Yield`: a value is ready, followed by the rest of the stream
//! - `Defer`: a suspended effectful computation that produces the next node.
//!   It is an `FnOnce`, so it runs at most once
//! - `Append` / `Interleave`: a one-at-a-time composition of two sub-streams
//! - `Fork`: a concurrent composition of two sub-streams, resolved by the
//!   scheduler when forced
//!
//! Forcing a node evaluates everything else until the head is known, i.e. until
//! the node is `Nil` or `Yield`. Compositions are unwound with an explicit stack
//! rather than nested futures, so thousands of left-nested appends force in
//! constant stack space.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::config::SchedulerConfig;
use crate::error::StreamResult;
use crate::scheduler::SharedChannel;

pub(crate) type Thunk<T> = Box<dyn FnOnce() -> BoxFuture<'static, StreamResult<Node<T>>> + Send>;

pub(crate) enum Node<T> {
    Nil,
    Yield(T, Box<Node<T>>),
    Defer(Thunk<T>),
    Append(Box<Node<T>>, Box<Node<T>>),
    Interleave(Box<Node<T>>, Box<Node<T>>),
    Fork(Fork<T>),
}

/// Pending right-hand side of a composition whose left side is being forced.
enum Frame<T> {
    Append(Node<T>),
    Interleave(Node<T>),
}

impl<T: Send + 'static> Frame<T> {
    fn into_rest(self) -> Node<T> {
        match self {
            Frame::Append(right) | Frame::Interleave(right) => right,
        }
    }

    /// Rebuild the composition after its left side produced a head, `rest` being
    /// what remains of that side.
    fn resume(self, rest: Node<T>) -> Node<T> {
        match self {
            Frame::Append(right) => Node::append(rest, right),
            Frame::Interleave(right) => Node::interleave(right, rest),
        }
    }
}

/// Which controller drives a concurrent composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ForkMode {
    Async,
    Parallel,
}

pub(crate) struct Fork<T> {
    pub mode: ForkMode,
    pub config: Arc<SchedulerConfig>,
    pub left: Box<Node<T>>,
    pub right: Box<Node<T>>,
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Nil => f.write_str("Nil"),
            Node::Yield(..) => f.write_str("Yield(..)"),
            Node::Defer(_) => f.write_str("Defer(..)"),
            Node::Append(..) => f.write_str("Append(..)"),
            Node::Interleave(..) => f.write_str("Interleave(..)"),
            Node::Fork(fork) => write!(f, "Fork({:?})", fork.mode),
        }
    }
}

impl<T: Send + 'static> Node<T> {
    pub fn defer<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = StreamResult<Node<T>>> + Send + 'static,
    {
        Node::Defer(Box::new(move || f().boxed()))
    }

    /// Defer a pure computation of the next node.
    pub fn lazy<F>(f: F) -> Self
    where
        F: FnOnce() -> Node<T> + Send + 'static,
    {
        Node::Defer(Box::new(move || future::ready(Ok(f())).boxed()))
    }

    pub fn cons(value: T, rest: Node<T>) -> Self {
        Node::Yield(value, Box::new(rest))
    }

    /// All of `left`, then all of `right`.
    pub fn append(left: Node<T>, right: Node<T>) -> Self {
        match (left, right) {
            (Node::Nil, other) | (other, Node::Nil) => other,
            (left, right) => Node::Append(Box::new(left), Box::new(right)),
        }
    }

    /// One head from `left`, then alternate with `right`.
    pub fn interleave(left: Node<T>, right: Node<T>) -> Self {
        match (left, right) {
            (Node::Nil, other) | (other, Node::Nil) => other,
            (left, right) => Node::Interleave(Box::new(left), Box::new(right)),
        }
    }

    pub fn fork(mode: ForkMode, config: Arc<SchedulerConfig>, left: Node<T>, right: Node<T>) -> Self {
        match (left, right) {
            (Node::Nil, other) | (other, Node::Nil) => other,
            (left, right) => Node::Fork(Fork {
                mode,
                config,
                left: Box::new(left),
                right: Box::new(right),
            }),
        }
    }

    /// Evaluate until the head is known. The result is `Nil` or `Yield`.
    pub async fn force(self) -> StreamResult<Node<T>> {
        let mut frames: Vec<Frame<T>> = Vec::new();
        let mut node = self;
        loop {
            node = match node {
                Node::Defer(thunk) => thunk().await?,
                Node::Fork(fork) => SharedChannel::launch(fork),
                Node::Append(left, right) => match *left {
                    // (a ++ b) ++ c == a ++ (b ++ c)
                    Node::Append(inner, middle) => Node::Append(inner, Box::new(Node::append(*middle, *right))),
                    left => {
                        frames.push(Frame::Append(*right));
                        left
                    }
                },
                Node::Interleave(left, right) => {
                    frames.push(Frame::Interleave(*right));
                    *left
                }
                Node::Nil => match frames.pop() {
                    Some(frame) => frame.into_rest(),
                    None => return Ok(Node::Nil),
                },
                Node::Yield(value, rest) => {
                    let rest = frames.into_iter().rev().fold(*rest, |rest, frame| frame.resume(rest));
                    return Ok(Node::Yield(value, Box::new(rest)));
                }
            };
        }
    }

    pub async fn uncons(self) -> StreamResult<Option<(T, Node<T>)>> {
        match self.force().await? {
            Node::Yield(value, rest) => Ok(Some((value, *rest))),
            _ => Ok(None),
        }
    }
}
