//! Runtime-tagged streams
//!
//! [`AnyStream`] carries its policy as a value instead of a type, for programs that
//! pick the composition discipline at runtime (from a config file, a CLI flag, ...).
//! Composition checks the tags and fails with
//! [`StreamError::PolicyMismatch`] where the typed API would not compile.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::config::SchedulerConfig;
use crate::error::{StreamError, StreamResult};
use crate::policy::{Policy, PolicyKind};
use crate::stream::compose::compose_node;
use crate::stream::node::Node;
use crate::stream::{SerialStream, Stream};

pub struct AnyStream<T> {
    kind: PolicyKind,
    node: Node<T>,
    config: Arc<SchedulerConfig>,
}

impl<T> fmt::Debug for AnyStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyStream")
            .field("kind", &self.kind)
            .field("node", &self.node)
            .finish()
    }
}

impl<T: Send + 'static, P: Policy> From<Stream<T, P>> for AnyStream<T> {
    fn from(stream: Stream<T, P>) -> Self {
        AnyStream::new(stream)
    }
}

impl<T: Send + 'static> AnyStream<T> {
    /// Erase the policy type of `stream`, keeping it as a tag.
    pub fn new<P: Policy>(stream: Stream<T, P>) -> Self {
        let (node, config) = stream.into_parts();
        Self {
            kind: P::KIND,
            node,
            config,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Re-tag the stream. Values are untouched.
    pub fn adapt(mut self, kind: PolicyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Compose with the operator of the shared policy, or fail when the tags differ.
    pub fn try_append(self, other: AnyStream<T>) -> StreamResult<Self> {
        if self.kind != other.kind {
            return Err(StreamError::PolicyMismatch {
                expected: self.kind,
                found: other.kind,
            });
        }
        if self.kind.is_concurrent() {
            debug!("Composing {} streams; forcing the result starts workers", self.kind);
        }
        let node = compose_node(self.kind, self.node, other.node, &self.config);
        Ok(Self {
            kind: self.kind,
            node,
            config: self.config,
        })
    }

    /// Recover the typed stream, or fail when the tag is not `P`.
    pub fn try_into_typed<P: Policy>(self) -> StreamResult<Stream<T, P>> {
        if self.kind != P::KIND {
            return Err(StreamError::PolicyMismatch {
                expected: P::KIND,
                found: self.kind,
            });
        }
        Ok(Stream::from_parts(self.node, self.config))
    }

    pub async fn to_list(self) -> StreamResult<Vec<T>> {
        let stream: SerialStream<T> = Stream::from_parts(self.node, self.config);
        stream.to_list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Interleaved, Parallel, Serial};
    use crate::stream::from_list;

    #[tokio::test]
    async fn same_tags_compose_with_their_operator() {
        let a = AnyStream::new(from_list::<_, Interleaved>(vec![1, 2]));
        let b = AnyStream::new(from_list::<_, Interleaved>(vec![3, 4]));
        let joined = a.try_append(b).unwrap();
        assert_eq!(joined.kind(), PolicyKind::Interleaved);
        assert_eq!(joined.to_list().await.unwrap(), vec![1, 3, 2, 4]);
    }

    #[tokio::test]
    async fn concurrent_tags_compose_with_workers() {
        let a = AnyStream::new(from_list::<_, Parallel>(vec![1, 2]));
        let b = AnyStream::new(from_list::<_, Parallel>(vec![3]));
        let joined = a.try_append(b).unwrap();
        assert!(joined.kind().is_concurrent());
        let mut values = joined.to_list().await.unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn different_tags_are_rejected() {
        let a: AnyStream<i32> = from_list::<_, Serial>(vec![1]).into();
        let b: AnyStream<i32> = from_list::<_, Parallel>(vec![2]).into();
        let err = a.try_append(b).unwrap_err();
        assert_eq!(
            err,
            StreamError::PolicyMismatch {
                expected: PolicyKind::Serial,
                found: PolicyKind::Parallel,
            }
        );
    }

    #[tokio::test]
    async fn typed_round_trip_checks_the_tag() {
        let any = AnyStream::new(from_list::<_, Serial>(vec![1, 2]));
        assert!(any.adapt(PolicyKind::Parallel).try_into_typed::<Serial>().is_err());

        let any = AnyStream::new(from_list::<_, Serial>(vec![1, 2]));
        let typed = any.try_into_typed::<Serial>().unwrap();
        assert_eq!(typed.to_list().await.unwrap(), vec![1, 2]);
    }
}
