//! Error types and handling for composed streams
//!
//! Every failure a stream can surface is a [`StreamError`]. Step failures keep the
//! caller's original error (and its source chain) behind a shared pointer so the
//! error can be cloned while travelling from a worker task to the consumer.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::policy::PolicyKind;

/// Main error type for stream operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StreamError {
    /// A caller-supplied step failed
    #[error("step failed: {0}")]
    Step(StepFailure),
    /// A step failed with a plain message
    #[error("stream error: {0}")]
    Custom(String),
    /// Two runtime-tagged streams with different policies were composed
    #[error("policy mismatch: expected {expected}, found {found}")]
    PolicyMismatch {
        expected: PolicyKind,
        found: PolicyKind,
    },
    /// A parallel composition asked for more workers than allowed
    #[error("resource exhausted: more than {limit} parallel workers requested")]
    ResourceExhausted { limit: usize },
    /// A step did not finish within its deadline
    #[error("operation timed out")]
    Timeout,
    /// The run was stopped before completion
    #[error("operation cancelled")]
    Cancelled,
}

impl StreamError {
    /// Wrap an arbitrary error raised by a step.
    pub fn step<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        StreamError::Step(StepFailure(Arc::new(err)))
    }

    /// Message-only failure, handy inside closures.
    pub fn custom(msg: impl Into<String>) -> Self {
        StreamError::Custom(msg.into())
    }

    /// Borrow the original step error if it has type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            StreamError::Step(failure) => failure.0.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// The caller's error as raised inside a step.
#[derive(Clone)]
pub struct StepFailure(Arc<dyn StdError + Send + Sync + 'static>);

impl StepFailure {
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

impl fmt::Debug for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

// Two failures are equal when they are the same raised error.
impl PartialEq for StepFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::step(err)
    }
}

impl From<tokio::time::error::Elapsed> for StreamError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StreamError::Timeout
    }
}

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failure_keeps_original_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing input");
        let err = StreamError::from(io);

        let inner = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(err.to_string(), "step failed: missing input");
    }

    #[test]
    fn cloned_step_failure_is_equal() {
        let err = StreamError::step(std::fmt::Error);
        assert_eq!(err.clone(), err);
        assert_ne!(err, StreamError::step(std::fmt::Error));
    }

    #[test]
    fn mismatch_message_names_both_policies() {
        let err = StreamError::PolicyMismatch {
            expected: PolicyKind::Serial,
            found: PolicyKind::Parallel,
        };
        assert_eq!(err.to_string(), "policy mismatch: expected serial, found parallel");
    }

    #[derive(Debug, Error)]
    #[error("could not load batch")]
    struct LoadError(#[source] std::io::Error);

    #[test]
    fn step_failure_exposes_the_source_chain() {
        let err = StreamError::step(LoadError(std::io::Error::new(std::io::ErrorKind::NotFound, "batch.csv")));
        let StreamError::Step(failure) = &err else {
            panic!("expected a step failure, got {:?}", err);
        };
        let inner = failure.inner();
        assert_eq!(inner.to_string(), "could not load batch");
        let cause = inner.source().and_then(|source| source.downcast_ref::<std::io::Error>());
        assert_eq!(cause.map(|io| io.kind()), Some(std::io::ErrorKind::NotFound));
    }
}
