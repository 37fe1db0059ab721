#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Importing everything, i.e.
/// `use desyn::prelude::*;` should be enough to work with the library.
pub mod prelude {
    pub use crate::automaton::{Automaton, AutomatonOptions, TransitionEditor};
    pub use crate::backend::{BoolGemm, HostGemm};
    pub use crate::errors::{DesError, Result};
    pub use crate::events::EventSet;
    pub use crate::math;
    pub use crate::operations::{supc, sync, sync_lazy, SyncProduct};
    pub use crate::sparse::{SparseBitMatrix, SparseEventMatrix};
    pub use crate::system::TransitionSystem;
    pub use crate::{Event, StateId, MAX_EVENTS};
}

/// Contains definitions of mathematical objects (sets, maps) which are used throughout the
/// crate and do not really fit anywhere else.
pub mod math;

/// Error type and result alias for the fallible query surface.
pub mod errors;

/// Fixed-width bit sets over event identifiers.
pub mod events;

pub mod sparse;

/// The common contract shared by concrete automata and lazy composition views.
pub mod system;

/// Concrete automata and the scoped transition editor.
pub mod automaton;

pub mod reachability;

pub mod operations;

pub mod dot;

pub mod backend;

/// Implements the generation of random automata.
#[cfg(feature = "random")]
pub mod random;

/// An event is identified by an integer in `0..MAX_EVENTS`. Bit positions inside an
/// [`events::EventSet`] are the canonical event identifiers.
pub type Event = u8;

/// States are identified by dense indices in `0..n`, where `n` is the size of the automaton
/// they belong to. Indices of a synchronous composition live in `0..n_left * n_right`.
pub type StateId = usize;

/// The compile-time cap on the number of distinct events an automaton may use. Event
/// identifiers at or above this value are rejected with [`errors::DesError::InvalidEvent`].
pub const MAX_EVENTS: usize = 255;
