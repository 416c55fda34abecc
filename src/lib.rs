pub mod config;
pub mod dynamic;
pub mod error;
pub mod policy;
pub mod stream;

mod scheduler;

// Re-export the stream API at the crate root
pub use stream::{
    async_append, cons, each, empty, fold_map_with, fold_with, for_each, from_futures_stream, from_list,
    from_list_m, interleave, iterate, once, parallel, repeat_m, replicate_m, serial, singleton, unfoldr,
    unfoldr_m, zip_async, zip_serial, AsyncStream, InterleavedStream, ParallelStream, SerialStream, Stream,
    ZipAsyncStream, ZipSerialStream,
};

pub use config::SchedulerConfig;
pub use dynamic::AnyStream;
pub use error::{StepFailure, StreamError, StreamResult};
pub use policy::{Async, Interleaved, Monadic, Parallel, Policy, PolicyKind, Serial, ZipAsync, ZipSerial};
