use crate::errors::Result;
use crate::events::EventSet;
use crate::math::OrderedSet;
use crate::{Event, StateId};

/// The contract shared by everything that behaves like a deterministic automaton over
/// event-labelled transitions.
///
/// Implemented by the concrete [`Automaton`](crate::automaton::Automaton) and by the lazy
/// [`SyncProduct`](crate::operations::SyncProduct) view, so that code exploring a system
/// (most importantly supervisor synthesis) does not care whether transitions are stored
/// or computed on demand.
///
/// All methods are pure queries. Absence of a transition is an ordinary answer
/// (`Ok(None)` / `Ok(false)`), not an error; an `Err` means the query itself was
/// malformed (out-of-range state, event beyond the cap) or the inverse graph has not
/// been prepared.
pub trait TransitionSystem {
    /// The number of states.
    fn size(&self) -> usize;

    /// The initial state. For an empty system this is 0 by convention.
    fn initial(&self) -> StateId;

    /// The marked (terminal) states, ascending.
    fn marked(&self) -> &OrderedSet<StateId>;

    /// The alphabet, i.e. the set of events the system uses.
    fn alphabet(&self) -> EventSet;

    /// The events enabled at `q`, i.e. the union of the labels of all edges leaving `q`.
    fn state_events(&self, q: StateId) -> Result<EventSet>;

    /// The union of the labels of all edges arriving at `q`.
    fn inv_state_events(&self, q: StateId) -> Result<EventSet>;

    /// Whether a transition `f(q, event)` exists.
    fn contains_trans(&self, q: StateId, event: Event) -> Result<bool> {
        Ok(self.state_events(q)?.test(EventSet::check(event)?))
    }

    /// The target of the transition `f(q, event)`, or `None` when it is undefined.
    /// Determinism guarantees that the target is unique.
    fn trans(&self, q: StateId, event: Event) -> Result<Option<StateId>>;

    /// Whether at least one inverse transition `f(q_from, event) = q` exists. Requires
    /// the inverse graph, see
    /// [`Automaton::allocate_inverted`](crate::automaton::Automaton::allocate_inverted).
    fn contains_inv_trans(&self, q: StateId, event: Event) -> Result<bool>;

    /// Every state `q_from` with `f(q_from, event) = q`, in ascending order and without
    /// duplicates. Requires the inverse graph.
    fn inv_trans(&self, q: StateId, event: Event) -> Result<Vec<StateId>>;
}
