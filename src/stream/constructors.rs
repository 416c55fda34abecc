//! Stream constructors: empty, once, singleton, from_list, unfoldr, repeat_m, ...
//!
//! Every constructor is generic over the policy, so the same generator can feed a
//! serial, interleaved, async or parallel program.

use std::future::Future;
use std::sync::Arc;

use futures_core::Stream as FuturesStream;
use futures_util::stream::{BoxStream, StreamExt};

use crate::error::StreamResult;
use crate::policy::Policy;

use super::core::Stream;
use super::node::Node;

// ================================
// Basic Constructors
// ================================

/// The stream with no elements; identity of every composition operator.
pub fn empty<T, P>() -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    Stream::from_node(Node::Nil)
}

/// A stream of exactly one pure value.
pub fn once<T, P>(value: T) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
{
    Stream::from_node(Node::cons(value, Node::Nil))
}

/// A stream of exactly one effectful step.
pub fn singleton<T, P, Fut>(action: Fut) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    Stream::from_node(step_node(action, Node::Nil))
}

/// Prepend an effectful step to `rest`.
pub fn cons<T, P, Fut>(action: Fut, rest: Stream<T, P>) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    let (node, config) = rest.into_parts();
    Stream::from_parts(step_node(action, node), config)
}

fn step_node<T, Fut>(action: Fut, rest: Node<T>) -> Node<T>
where
    T: Send + 'static,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    Node::defer(move || async move { Ok(Node::cons(action.await?, rest)) })
}

// ================================
// Collection Constructors
// ================================

/// A stream of the items of `iter`, pulled lazily.
pub fn from_list<I, P>(iter: I) -> Stream<I::Item, P>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    P: Policy,
{
    Stream::from_node(iter_node(iter.into_iter()))
}

/// Alias of [`from_list`], reads well at the head of a `bind` chain.
pub fn each<I, P>(iter: I) -> Stream<I::Item, P>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    P: Policy,
{
    from_list(iter)
}

fn iter_node<I>(mut iter: I) -> Node<I::Item>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
{
    Node::lazy(move || match iter.next() {
        Some(item) => Node::cons(item, iter_node(iter)),
        None => Node::Nil,
    })
}

/// A stream running each action of `actions` in order and yielding its result.
pub fn from_list_m<I, T, P, Fut>(actions: I) -> Stream<T, P>
where
    I: IntoIterator<Item = Fut>,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
    P: Policy,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    Stream::from_node(actions_node(actions.into_iter()))
}

fn actions_node<I, T, Fut>(mut actions: I) -> Node<T>
where
    I: Iterator<Item = Fut> + Send + 'static,
    T: Send + 'static,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    Node::defer(move || async move {
        Ok(match actions.next() {
            Some(action) => Node::cons(action.await?, actions_node(actions)),
            None => Node::Nil,
        })
    })
}

/// Adapt any `futures` stream.
pub fn from_futures_stream<S, P>(stream: S) -> Stream<S::Item, P>
where
    S: FuturesStream + Send + 'static,
    S::Item: Send + 'static,
    P: Policy,
{
    Stream::from_node(futures_node(stream.boxed()))
}

fn futures_node<T: Send + 'static>(mut stream: BoxStream<'static, T>) -> Node<T> {
    Node::defer(move || async move {
        Ok(match stream.next().await {
            Some(item) => Node::cons(item, futures_node(stream)),
            None => Node::Nil,
        })
    })
}

// ================================
// Function-based Constructors
// ================================

/// Build a stream from a seed: `f` returns the next element and seed, or `None`
/// to stop.
///
/// ```
/// use rs2_compose::{unfoldr, SerialStream};
///
/// # async fn example() {
/// let countdown: SerialStream<u32> = unfoldr(3, |n| (n > 0).then(|| (n, n - 1)));
/// assert_eq!(countdown.to_list().await.unwrap(), vec![3, 2, 1]);
/// # }
/// ```
pub fn unfoldr<S, T, P, F>(seed: S, f: F) -> Stream<T, P>
where
    S: Send + 'static,
    T: Send + 'static,
    P: Policy,
    F: Fn(S) -> Option<(T, S)> + Send + Sync + 'static,
{
    Stream::from_node(unfoldr_node(seed, Arc::new(f)))
}

fn unfoldr_node<S, T, F>(seed: S, f: Arc<F>) -> Node<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: Fn(S) -> Option<(T, S)> + Send + Sync + 'static,
{
    Node::lazy(move || match f(seed) {
        Some((item, next)) => Node::cons(item, unfoldr_node(next, f)),
        None => Node::Nil,
    })
}

/// Effectful [`unfoldr`].
pub fn unfoldr_m<S, T, P, F, Fut>(seed: S, f: F) -> Stream<T, P>
where
    S: Send + 'static,
    T: Send + 'static,
    P: Policy,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<Option<(T, S)>>> + Send + 'static,
{
    Stream::from_node(unfoldr_m_node(seed, Arc::new(f)))
}

fn unfoldr_m_node<S, T, F, Fut>(seed: S, f: Arc<F>) -> Node<T>
where
    S: Send + 'static,
    T: Send + 'static,
    F: Fn(S) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<Option<(T, S)>>> + Send + 'static,
{
    Node::defer(move || async move {
        Ok(match f(seed).await? {
            Some((item, next)) => Node::cons(item, unfoldr_m_node(next, f)),
            None => Node::Nil,
        })
    })
}

/// Run `action` forever, yielding each result.
pub fn repeat_m<T, P, F, Fut>(action: F) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    unfoldr_m((), move |()| {
        let step = action();
        async move { Ok(Some((step.await?, ()))) }
    })
}

/// Run `action` `n` times, yielding each result.
pub fn replicate_m<T, P, F, Fut>(n: usize, action: F) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StreamResult<T>> + Send + 'static,
{
    unfoldr_m(n, move |left| {
        let step = (left > 0).then(&action);
        async move {
            match step {
                Some(step) => Ok(Some((step.await?, left - 1))),
                None => Ok(None),
            }
        }
    })
}

/// `seed, f(seed), f(f(seed)), ...`
pub fn iterate<T, P, F>(seed: T, f: F) -> Stream<T, P>
where
    T: Send + 'static,
    P: Policy,
    F: Fn(&T) -> T + Send + Sync + 'static,
{
    unfoldr(seed, move |current| {
        let next = f(&current);
        Some((current, next))
    })
}
