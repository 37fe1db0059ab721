use thiserror::Error;

use crate::{Event, StateId};

/// The error type for fallible queries and edits.
///
/// Queries signal ordinary absence through their return value (`Ok(None)` from
/// [`trans`](crate::system::TransitionSystem::trans), `Ok(false)` from
/// [`contains_trans`](crate::system::TransitionSystem::contains_trans)); an `Err` always
/// means the call itself was malformed or a required preparation step is missing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesError {
    /// A state index at or beyond the number of states of the queried system.
    #[error("state {state} is out of range for a system with {bound} states")]
    InvalidState {
        /// The offending index.
        state: StateId,
        /// The number of states of the queried system.
        bound: usize,
    },
    /// An event identifier at or beyond [`MAX_EVENTS`](crate::MAX_EVENTS).
    #[error("event {event} exceeds the event cap")]
    InvalidEvent {
        /// The offending identifier.
        event: Event,
    },
    /// Inserting the edge would give the same (state, event) pair a second target.
    #[error("transition from {from} on {event} already leads to {existing}, cannot also lead to {conflicting}")]
    Nondeterminism {
        /// Source state of the rejected edge.
        from: StateId,
        /// Event of the rejected edge.
        event: Event,
        /// The target already on record.
        existing: StateId,
        /// The target whose insertion was rejected.
        conflicting: StateId,
    },
    /// An inverse transition query was made before the inverse graph was allocated.
    #[error("inverse graph is not allocated, call allocate_inverted first")]
    NotPrepared,
}

/// Alias for results produced by this crate.
pub type Result<T> = std::result::Result<T, DesError>;
