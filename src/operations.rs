//! Operations combining two automata.
//!
//! [`sync`] and [`sync_lazy`] compute the synchronous (parallel) composition, which
//! synchronizes the factors on their shared events and interleaves the rest. The lazy
//! variant returns a [`SyncProduct`] view that answers transition queries without
//! materializing the product; the eager variant materializes immediately. [`supc`]
//! builds on the lazy view to synthesize the monolithic supervisor.

mod sync;
pub use sync::{sync, sync_lazy, SyncProduct};

mod supervisor;
pub use supervisor::supc;
