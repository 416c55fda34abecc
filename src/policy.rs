//! Composition policies
//!
//! A policy decides how two streams combine and how nested iterations of a
//! [`bind`](crate::stream::Stream::bind) are scheduled. Each policy is a zero-sized
//! marker type; [`PolicyKind`] is its runtime name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime name of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyKind {
    Serial,
    Interleaved,
    Async,
    Parallel,
    ZipSerial,
    ZipAsync,
}

impl PolicyKind {
    /// Whether streams of this policy are evaluated by worker tasks.
    pub fn is_concurrent(self) -> bool {
        matches!(self, PolicyKind::Async | PolicyKind::Parallel | PolicyKind::ZipAsync)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyKind::Serial => "serial",
            PolicyKind::Interleaved => "interleaved",
            PolicyKind::Async => "async",
            PolicyKind::Parallel => "parallel",
            PolicyKind::ZipSerial => "zip-serial",
            PolicyKind::ZipAsync => "zip-async",
        };
        f.write_str(name)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Implemented by every policy marker.
pub trait Policy: sealed::Sealed + Send + Sync + 'static {
    const KIND: PolicyKind;
}

/// Policies that support [`bind`](crate::stream::Stream::bind).
/// The zip policies are applicative only.
pub trait Monadic: Policy {}

/// Depth-first, one step at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

/// Breadth-first: siblings take turns, one value each.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interleaved;

/// Depth-first triggering with demand-driven concurrency.
#[derive(Debug, Clone, Copy, Default)]
pub struct Async;

/// Every branch runs concurrently; output is drained round-robin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parallel;

/// Applicative zipping, both sides pulled in turn.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipSerial;

/// Applicative zipping, both sides produced concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipAsync;

impl sealed::Sealed for Serial {}
impl Policy for Serial {
    const KIND: PolicyKind = PolicyKind::Serial;
}

impl sealed::Sealed for Interleaved {}
impl Policy for Interleaved {
    const KIND: PolicyKind = PolicyKind::Interleaved;
}

impl sealed::Sealed for Async {}
impl Policy for Async {
    const KIND: PolicyKind = PolicyKind::Async;
}

impl sealed::Sealed for Parallel {}
impl Policy for Parallel {
    const KIND: PolicyKind = PolicyKind::Parallel;
}

impl sealed::Sealed for ZipSerial {}
impl Policy for ZipSerial {
    const KIND: PolicyKind = PolicyKind::ZipSerial;
}

impl sealed::Sealed for ZipAsync {}
impl Policy for ZipAsync {
    const KIND: PolicyKind = PolicyKind::ZipAsync;
}

impl Monadic for Serial {}
impl Monadic for Interleaved {}
impl Monadic for Async {}
impl Monadic for Parallel {}
