//! Monadic sequencing
//!
//! `stream.bind(f)` runs `f(v)` for every value `v` of `stream` and combines the
//! resulting streams with the operator of the policy, the same operator that
//! [`Stream::append`] uses. Nested binds therefore behave like nested loops whose
//! levels are composed serially, interleaved, asynchronously or in parallel
//! depending on one type.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::policy::{Monadic, PolicyKind};

use super::compose::compose_node;
use super::core::Stream;
use super::node::Node;

impl<T: Send + 'static, P: Monadic> Stream<T, P> {
    /// For each value, run the stream `f` returns; combine with the policy's
    /// operator.
    ///
    /// ```
    /// use rs2_compose::{each, Serial, Stream};
    ///
    /// # async fn example() {
    /// let pairs: Stream<(u8, u8), Serial> =
    ///     each(vec![1, 2]).bind(|x| each(vec![3, 4]).map(move |y| (x, y)));
    /// assert_eq!(
    ///     pairs.to_list().await.unwrap(),
    ///     vec![(1, 3), (1, 4), (2, 3), (2, 4)]
    /// );
    /// # }
    /// ```
    pub fn bind<U, F>(self, f: F) -> Stream<U, P>
    where
        U: Send + 'static,
        F: Fn(T) -> Stream<U, P> + Send + Sync + 'static,
    {
        let (node, config) = self.into_parts();
        let f = Arc::new(move |value: T| f(value).node);
        Stream::from_parts(bind_node(P::KIND, node, f, config.clone()), config)
    }

    /// Alias of [`bind`](Stream::bind).
    pub fn concat_map<U, F>(self, f: F) -> Stream<U, P>
    where
        U: Send + 'static,
        F: Fn(T) -> Stream<U, P> + Send + Sync + 'static,
    {
        self.bind(f)
    }
}

/// Run `f` for every value of `stream`; the loop body of a stream program.
pub fn for_each<T, U, P, F>(stream: Stream<T, P>, f: F) -> Stream<U, P>
where
    T: Send + 'static,
    U: Send + 'static,
    P: Monadic,
    F: Fn(T) -> Stream<U, P> + Send + Sync + 'static,
{
    stream.bind(f)
}

fn bind_node<T, U, F>(kind: PolicyKind, node: Node<T>, f: Arc<F>, config: Arc<SchedulerConfig>) -> Node<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: Fn(T) -> Node<U> + Send + Sync + 'static,
{
    Node::defer(move || async move {
        Ok(match node.uncons().await? {
            Some((value, rest)) => {
                let head = f(value);
                let tail = bind_node(kind, rest, f, config.clone());
                compose_node(kind, head, tail, &config)
            }
            None => Node::Nil,
        })
    })
}
