use itertools::Itertools;
use tracing::debug;

use crate::errors::{DesError, Result};
use crate::events::EventSet;
use crate::math::{Map, OrderedSet};
use crate::sparse::{SparseBitMatrix, SparseEventMatrix};
use crate::system::TransitionSystem;
use crate::{Event, StateId};

/// Options recognized when constructing an [`Automaton`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutomatonOptions {
    /// Mirror the bit graph on an accelerator device. A no-op in the CPU-only build; kept
    /// so that enabling a device backend does not change the construction surface. See
    /// [`backend`](crate::backend).
    pub device_cache: bool,
}

/// A deterministic finite automaton modelling a discrete event system.
///
/// The transition structure lives in two companion matrices. `graph` is a row-major
/// sparse matrix whose entry at `(i, j)` is the [`EventSet`] labelling the edge `i → j`;
/// an absent entry means there is no edge. `bit_graph` is a column-major boolean matrix
/// holding one entry per edge in *reversed* orientation, `(to, from)`, together with
/// the full identity diagonal. The reversal is what makes `bit_graph · x` push the
/// support of a state vector `x` along transitions, and the diagonal keeps already
/// reached states alive across the repeated products that implement breadth-first
/// reachability (see [`reachability`](crate::reachability)).
///
/// Per-state caches of outgoing and incoming event labels are maintained on every edit,
/// so [`state_events`](TransitionSystem::state_events) is a plain array lookup.
///
/// Edges are added through the scoped [`TransitionEditor`] returned by [`edit`](Self::edit):
///
/// ```
/// use desyn::prelude::*;
///
/// let mut sys = Automaton::new(2, 0, [1]);
/// {
///     let mut edit = sys.edit();
///     edit.insert(0, 4, 1).unwrap();
///     edit.insert(1, 2, 0).unwrap();
/// }
/// assert_eq!(sys.trans(0, 4).unwrap(), Some(1));
/// assert_eq!(sys.trans(0, 2).unwrap(), None);
/// ```
#[derive(Clone, Debug)]
pub struct Automaton {
    size: usize,
    initial: StateId,
    marked: OrderedSet<StateId>,
    alphabet: EventSet,
    graph: SparseEventMatrix,
    bit_graph: SparseBitMatrix,
    state_events: Vec<EventSet>,
    inv_state_events: Vec<EventSet>,
    inverted: Option<SparseEventMatrix>,
    options: AutomatonOptions,
}

impl Automaton {
    /// Creates an automaton with `size` states, no transitions, the given initial state
    /// and the given marked states. The bit graph starts out as the identity.
    ///
    /// # Panics
    /// When `initial` or a marked state is out of range. (A zero-state automaton is
    /// permitted; its reported initial state is 0 by convention.)
    pub fn new<I: IntoIterator<Item = StateId>>(size: usize, initial: StateId, marked: I) -> Self {
        Self::with_options(size, initial, marked, AutomatonOptions::default())
    }

    /// Like [`new`](Self::new), but with explicit [`AutomatonOptions`].
    pub fn with_options<I: IntoIterator<Item = StateId>>(
        size: usize,
        initial: StateId,
        marked: I,
        options: AutomatonOptions,
    ) -> Self {
        assert!(
            initial < size || (size == 0 && initial == 0),
            "initial state {initial} out of range for {size} states"
        );
        let marked: OrderedSet<StateId> = marked.into_iter().collect();
        if let Some(&largest) = marked.iter().next_back() {
            assert!(largest < size, "marked state {largest} out of range for {size} states");
        }
        let mut graph = SparseEventMatrix::new(size, size);
        graph.seal();
        Self {
            size,
            initial,
            marked,
            alphabet: EventSet::default(),
            graph,
            bit_graph: SparseBitMatrix::identity(size),
            state_events: vec![EventSet::default(); size],
            inv_state_events: vec![EventSet::default(); size],
            inverted: None,
            options,
        }
    }

    /// The zero-state automaton, the result of trimming a system with an empty language.
    pub fn empty() -> Self {
        Self::new(0, 0, [])
    }

    pub(crate) fn from_parts(
        size: usize,
        initial: StateId,
        marked: OrderedSet<StateId>,
        alphabet: EventSet,
        graph: SparseEventMatrix,
        bit_graph: SparseBitMatrix,
        state_events: Vec<EventSet>,
        inv_state_events: Vec<EventSet>,
        options: AutomatonOptions,
    ) -> Self {
        Self {
            size,
            initial,
            marked,
            alphabet,
            graph,
            bit_graph,
            state_events,
            inv_state_events,
            inverted: None,
            options,
        }
    }

    /// The options this automaton was constructed with.
    pub fn options(&self) -> AutomatonOptions {
        self.options
    }

    /// Read access to the event-labelled adjacency matrix.
    pub fn graph(&self) -> &SparseEventMatrix {
        &self.graph
    }

    /// Read access to the structural bit graph (reversed edges plus identity).
    pub fn bit_graph(&self) -> &SparseBitMatrix {
        &self.bit_graph
    }

    /// The events labelling the edge `from → to`; empty when there is no such edge.
    pub fn events_between(&self, from: StateId, to: StateId) -> Result<EventSet> {
        self.check_state(from)?;
        self.check_state(to)?;
        Ok(self.graph.get(from, to))
    }

    /// Opens the automaton for edge insertion and returns the scoped editor. Editing a
    /// sealed automaton forces an unseal; dropping the editor seals again, at the cost
    /// of re-compression. Any previously allocated inverse graph is released, since
    /// edits would invalidate it.
    pub fn edit(&mut self) -> TransitionEditor<'_> {
        self.inverted = None;
        self.graph.unseal();
        self.bit_graph.unseal();
        let mut targets = Map::default();
        for (from, to, set) in self.graph.triplets() {
            for event in set.iter() {
                targets.insert((from, event), to);
            }
        }
        TransitionEditor {
            automaton: self,
            targets,
        }
    }

    /// Seals the underlying matrices for traversal. Dropping a [`TransitionEditor`]
    /// already does this, so the call is normally a no-op; it is idempotent.
    pub fn seal(&mut self) {
        self.graph.seal();
        self.bit_graph.seal();
    }

    /// Materializes the transpose of the adjacency matrix so that inverse transition
    /// queries can be answered. Costs O(|edges|); idempotent. Call
    /// [`clear_inverted`](Self::clear_inverted) to release the memory when done.
    pub fn allocate_inverted(&mut self) {
        if self.inverted.is_none() {
            self.inverted = Some(self.graph.transpose());
        }
    }

    /// Releases the inverse graph. Idempotent.
    pub fn clear_inverted(&mut self) {
        self.inverted = None;
    }

    /// Whether the inverse graph is currently allocated.
    pub fn is_inverted(&self) -> bool {
        self.inverted.is_some()
    }

    fn check_state(&self, q: StateId) -> Result<StateId> {
        if q < self.size {
            Ok(q)
        } else {
            Err(DesError::InvalidState {
                state: q,
                bound: self.size,
            })
        }
    }

    /// Outgoing event cache lookup without validation; `q` must be in range.
    pub(crate) fn out_events(&self, q: StateId) -> EventSet {
        self.state_events[q]
    }

    /// Incoming event cache lookup without validation; `q` must be in range.
    pub(crate) fn in_events(&self, q: StateId) -> EventSet {
        self.inv_state_events[q]
    }

    /// Row scan for the target of `(q, event)`; `q` must be in range.
    pub(crate) fn successor(&self, q: StateId, event: Event) -> Option<StateId> {
        if !self.state_events[q].test(event) {
            return None;
        }
        self.graph
            .row(q)
            .find(|(_, set)| set.test(event))
            .map(|(to, _)| to)
    }

    /// Ascending scan of the prepared inverse graph for the sources of `(q, event)`.
    /// `q` must be in range and the inverse graph allocated.
    pub(crate) fn predecessors(&self, q: StateId, event: Event) -> Vec<StateId> {
        let inverted = self
            .inverted
            .as_ref()
            .expect("inverse graph is allocated while predecessors are queried");
        inverted
            .row(q)
            .filter(|(_, set)| set.test(event))
            .map(|(from, _)| from)
            .collect()
    }
}

impl TransitionSystem for Automaton {
    fn size(&self) -> usize {
        self.size
    }

    fn initial(&self) -> StateId {
        self.initial
    }

    fn marked(&self) -> &OrderedSet<StateId> {
        &self.marked
    }

    fn alphabet(&self) -> EventSet {
        self.alphabet
    }

    fn state_events(&self, q: StateId) -> Result<EventSet> {
        self.check_state(q)?;
        Ok(self.state_events[q])
    }

    fn inv_state_events(&self, q: StateId) -> Result<EventSet> {
        self.check_state(q)?;
        Ok(self.inv_state_events[q])
    }

    fn trans(&self, q: StateId, event: Event) -> Result<Option<StateId>> {
        self.check_state(q)?;
        EventSet::check(event)?;
        Ok(self.successor(q, event))
    }

    fn contains_inv_trans(&self, q: StateId, event: Event) -> Result<bool> {
        self.check_state(q)?;
        EventSet::check(event)?;
        if self.inverted.is_none() {
            return Err(DesError::NotPrepared);
        }
        Ok(self.inv_state_events[q].test(event))
    }

    fn inv_trans(&self, q: StateId, event: Event) -> Result<Vec<StateId>> {
        self.check_state(q)?;
        EventSet::check(event)?;
        if self.inverted.is_none() {
            return Err(DesError::NotPrepared);
        }
        Ok(self.predecessors(q, event))
    }
}

/// A scoped write handle for inserting edges into an [`Automaton`].
///
/// Obtained from [`Automaton::edit`]. Inserting keeps the per-state caches, the alphabet
/// and the bit graph consistent with the event graph; dropping the editor seals both
/// matrices.
pub struct TransitionEditor<'a> {
    automaton: &'a mut Automaton,
    targets: Map<(StateId, Event), StateId>,
}

impl TransitionEditor<'_> {
    /// Inserts `event` into the label of the edge `from → to`.
    ///
    /// Repeating an insertion is a no-op. Giving the same `(from, event)` pair a second,
    /// distinct target is rejected with [`DesError::Nondeterminism`].
    pub fn insert(&mut self, from: StateId, event: Event, to: StateId) -> Result<()> {
        let automaton = &mut *self.automaton;
        if from >= automaton.size {
            return Err(DesError::InvalidState {
                state: from,
                bound: automaton.size,
            });
        }
        if to >= automaton.size {
            return Err(DesError::InvalidState {
                state: to,
                bound: automaton.size,
            });
        }
        EventSet::check(event)?;
        if let Some(&existing) = self.targets.get(&(from, event)) {
            if existing == to {
                return Ok(());
            }
            return Err(DesError::Nondeterminism {
                from,
                event,
                existing,
                conflicting: to,
            });
        }
        self.targets.insert((from, event), to);
        automaton.graph.add(from, to, EventSet::singleton(event));
        automaton.bit_graph.add(to, from);
        automaton.alphabet.set(event);
        automaton.state_events[from].set(event);
        automaton.inv_state_events[to].set(event);
        Ok(())
    }
}

impl Drop for TransitionEditor<'_> {
    fn drop(&mut self) {
        self.automaton.graph.seal();
        self.automaton.bit_graph.seal();
        debug!(
            states = self.automaton.size,
            transitions = self.automaton.graph.nnz(),
            "sealed automaton"
        );
    }
}

impl std::fmt::Display for Automaton {
    /// Renders the dense adjacency matrix with each entry shown as the decimal bit mask
    /// of its events, provided the alphabet fits into one machine word; larger alphabets
    /// fall back to set notation.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for from in 0..self.size {
            let line = (0..self.size)
                .map(|to| {
                    let set = self.graph.get(from, to);
                    match set.low_mask() {
                        Some(mask) => mask.to_string(),
                        None => format!("{set:?}"),
                    }
                })
                .join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_one() -> Automaton {
        // events a = 0, b = 1, g = 2
        let mut sys = Automaton::new(4, 0, [0, 2]);
        let mut edit = sys.edit();
        edit.insert(0, 0, 0).unwrap();
        edit.insert(0, 2, 2).unwrap();
        edit.insert(1, 0, 0).unwrap();
        edit.insert(1, 1, 1).unwrap();
        edit.insert(2, 2, 1).unwrap();
        edit.insert(2, 1, 2).unwrap();
        edit.insert(2, 0, 3).unwrap();
        drop(edit);
        sys
    }

    #[test]
    fn construction_and_queries() {
        let sys = scenario_one();
        assert_eq!(sys.size(), 4);
        assert_eq!(sys.initial(), 0);
        assert_eq!(sys.marked().iter().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(sys.alphabet(), EventSet::from_events([0, 1, 2]));

        assert_eq!(sys.trans(0, 0).unwrap(), Some(0));
        assert_eq!(sys.trans(0, 2).unwrap(), Some(2));
        assert_eq!(sys.trans(2, 0).unwrap(), Some(3));
        assert_eq!(sys.trans(0, 1).unwrap(), None);
        assert!(sys.contains_trans(2, 1).unwrap());
        assert!(!sys.contains_trans(3, 0).unwrap());

        assert_eq!(sys.state_events(2).unwrap(), EventSet::from_events([0, 1, 2]));
        assert_eq!(sys.inv_state_events(1).unwrap(), EventSet::from_events([1, 2]));
        assert_eq!(sys.events_between(2, 1).unwrap(), EventSet::singleton(2));
    }

    #[test]
    fn caches_match_live_aggregates() {
        let sys = scenario_one();
        for q in 0..sys.size() {
            let mut out = EventSet::default();
            for (_, set) in sys.graph().row(q) {
                out |= *set;
            }
            assert_eq!(sys.state_events(q).unwrap(), out);

            let mut incoming = EventSet::default();
            for from in 0..sys.size() {
                incoming |= sys.graph().get(from, q);
            }
            assert_eq!(sys.inv_state_events(q).unwrap(), incoming);
        }
    }

    #[test]
    fn bit_graph_is_reversed_adjacency_plus_identity() {
        let sys = scenario_one();
        for from in 0..sys.size() {
            for to in 0..sys.size() {
                let expected = from == to || sys.graph().get(from, to).any();
                assert_eq!(sys.bit_graph().get(to, from), expected, "edge {from}→{to}");
            }
        }
    }

    #[test]
    fn inverse_queries_require_allocation() {
        let mut sys = scenario_one();
        assert_eq!(sys.inv_trans(0, 0), Err(DesError::NotPrepared));
        assert_eq!(sys.contains_inv_trans(0, 0), Err(DesError::NotPrepared));

        sys.allocate_inverted();
        assert!(sys.is_inverted());
        assert_eq!(sys.inv_trans(0, 0).unwrap(), vec![0, 1]);
        assert_eq!(sys.inv_trans(1, 2).unwrap(), vec![2]);
        assert_eq!(sys.inv_trans(1, 1).unwrap(), vec![1]);
        assert_eq!(sys.inv_trans(1, 0).unwrap(), Vec::<StateId>::new());
        assert!(sys.contains_inv_trans(1, 2).unwrap());

        sys.clear_inverted();
        assert_eq!(sys.inv_trans(0, 0), Err(DesError::NotPrepared));
    }

    #[test]
    fn editor_rejects_invalid_input() {
        let mut sys = Automaton::new(2, 0, []);
        let mut edit = sys.edit();
        assert_eq!(
            edit.insert(2, 0, 0),
            Err(DesError::InvalidState { state: 2, bound: 2 })
        );
        assert_eq!(
            edit.insert(0, 0, 5),
            Err(DesError::InvalidState { state: 5, bound: 2 })
        );
        assert_eq!(edit.insert(0, 255, 1), Err(DesError::InvalidEvent { event: 255 }));
    }

    #[test]
    fn determinism_is_enforced_and_duplicates_tolerated() {
        let mut sys = Automaton::new(3, 0, []);
        let mut edit = sys.edit();
        edit.insert(0, 1, 1).unwrap();
        // exact repetition is a no-op
        edit.insert(0, 1, 1).unwrap();
        assert_eq!(
            edit.insert(0, 1, 2),
            Err(DesError::Nondeterminism {
                from: 0,
                event: 1,
                existing: 1,
                conflicting: 2,
            })
        );
        drop(edit);
        assert_eq!(sys.graph().nnz(), 1);
    }

    #[test]
    fn reopening_preserves_determinism_bookkeeping() {
        let mut sys = Automaton::new(3, 0, []);
        sys.edit().insert(0, 1, 1).unwrap();
        // a second editing session still knows about the earlier target
        let mut edit = sys.edit();
        assert_eq!(
            edit.insert(0, 1, 2),
            Err(DesError::Nondeterminism {
                from: 0,
                event: 1,
                existing: 1,
                conflicting: 2,
            })
        );
        edit.insert(1, 0, 2).unwrap();
        drop(edit);
        assert_eq!(sys.trans(0, 1).unwrap(), Some(1));
        assert_eq!(sys.trans(1, 0).unwrap(), Some(2));
    }

    #[test]
    fn editing_releases_the_inverse_graph() {
        let mut sys = scenario_one();
        sys.allocate_inverted();
        sys.edit().insert(3, 1, 3).unwrap();
        assert!(!sys.is_inverted());
    }

    #[test]
    fn out_of_range_queries_fail() {
        let sys = scenario_one();
        assert_eq!(
            sys.trans(9, 0),
            Err(DesError::InvalidState { state: 9, bound: 4 })
        );
        assert_eq!(
            sys.state_events(4),
            Err(DesError::InvalidState { state: 4, bound: 4 })
        );
        assert_eq!(sys.trans(0, 255), Err(DesError::InvalidEvent { event: 255 }));
    }

    #[test]
    fn display_uses_event_masks() {
        let mut sys = Automaton::new(2, 0, []);
        {
            let mut edit = sys.edit();
            edit.insert(0, 0, 1).unwrap();
            edit.insert(0, 2, 1).unwrap();
            edit.insert(1, 1, 0).unwrap();
        }
        assert_eq!(format!("{sys}"), "0 5\n2 0\n");
    }
}
