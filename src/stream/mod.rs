//! Policy-tagged streams and their combinators
//!
//! A stream is built from constructors, transformed, composed with one of the
//! four composition operators or sequenced with `bind`, and finally consumed by a
//! runner. Only composition and scheduling depend on the policy.

pub(crate) mod node;

pub mod core;
pub mod constructors;
pub mod compose;
pub mod bind;
pub mod zip;
pub mod runner;

// Re-export core types
pub use self::core::{
    AsyncStream, InterleavedStream, ParallelStream, SerialStream, Stream, ZipAsyncStream, ZipSerialStream,
};

// Re-export constructors
pub use constructors::{
    cons, each, empty, from_futures_stream, from_list, from_list_m, iterate, once, repeat_m, replicate_m,
    singleton, unfoldr, unfoldr_m,
};

// Re-export composition operators
pub use compose::{async_append, fold_map_with, fold_with, interleave, parallel, serial};

pub use bind::for_each;
pub use zip::{zip_async, zip_serial};
