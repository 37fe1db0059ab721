use tracing::warn;

use crate::automaton::{Automaton, AutomatonOptions};
use crate::errors::{DesError, Result};
use crate::events::EventSet;
use crate::math::OrderedSet;
use crate::sparse::{SparseBitMatrix, SparseEventMatrix};
use crate::system::TransitionSystem;
use crate::{Event, StateId};

/// The synchronous composition of two automata as a concrete [`Automaton`].
///
/// The composed state `(qx, qy)`, with `qx` from `left` and `qy` from `right`, is encoded as
/// `qy * left.size() + qx`, so the left index varies fastest. Faster than going through
/// the lazy view when the whole product is needed, but the product of large systems can
/// occupy a lot of memory; prefer [`sync_lazy`] when it does not have to exist at once.
pub fn sync(left: &Automaton, right: &Automaton) -> Automaton {
    sync_lazy(left, right).to_concrete()
}

/// The synchronous composition of two automata as a lazy [`SyncProduct`] view.
pub fn sync_lazy<'a>(left: &'a Automaton, right: &'a Automaton) -> SyncProduct<'a> {
    SyncProduct::new(left, right)
}

/// A virtual automaton over the Cartesian product of two factor automata.
///
/// Holds borrowed references to its factors and answers every
/// [`TransitionSystem`] query by consulting them, so the quadratic state space is never
/// stored. Product states are encoded as `qy * n_left + qx`. On a shared event both
/// factors step together; on an event private to one factor only that factor steps.
///
/// ```
/// use desyn::prelude::*;
///
/// let mut left = Automaton::new(3, 0, [0]);
/// left.edit().insert(0, 0, 1).unwrap();
/// let mut right = Automaton::new(2, 0, [0]);
/// right.edit().insert(0, 1, 1).unwrap();
///
/// let product = sync_lazy(&left, &right);
/// assert_eq!(product.size(), 6);
/// assert_eq!(product.decode(4), (1, 1));
/// assert_eq!(product.encode(1, 1), 4);
/// ```
#[derive(Clone, Debug)]
pub struct SyncProduct<'a> {
    left: &'a Automaton,
    right: &'a Automaton,
    n_left: usize,
    shared: EventSet,
    solo_left: EventSet,
    solo_right: EventSet,
    alphabet: EventSet,
    initial: StateId,
    marked: OrderedSet<StateId>,
}

impl<'a> SyncProduct<'a> {
    fn new(left: &'a Automaton, right: &'a Automaton) -> Self {
        let shared = left.alphabet() & right.alphabet();
        let solo_left = left.alphabet() ^ shared;
        let solo_right = right.alphabet() ^ shared;
        let n_left = left.size();
        let mut marked = OrderedSet::new();
        for &my in right.marked() {
            for &mx in left.marked() {
                marked.insert(my * n_left + mx);
            }
        }
        Self {
            left,
            right,
            n_left,
            shared,
            solo_left,
            solo_right,
            alphabet: left.alphabet() | right.alphabet(),
            initial: right.initial() * n_left + left.initial(),
            marked,
        }
    }

    /// The events shared by both factors.
    pub fn shared_events(&self) -> EventSet {
        self.shared
    }

    /// The events private to the left factor.
    pub fn solo_left_events(&self) -> EventSet {
        self.solo_left
    }

    /// The events private to the right factor.
    pub fn solo_right_events(&self) -> EventSet {
        self.solo_right
    }

    /// Encodes a pair of factor states into a product state.
    pub fn encode(&self, qx: StateId, qy: StateId) -> StateId {
        qy * self.n_left + qx
    }

    /// Decodes a product state into its `(left, right)` factor states.
    pub fn decode(&self, q: StateId) -> (StateId, StateId) {
        (q % self.n_left, q / self.n_left)
    }

    /// The events enabled at the product state `q`: shared events enabled in both
    /// factors, plus private events enabled in their factor.
    pub(crate) fn enabled(&self, q: StateId) -> EventSet {
        let (qx, qy) = self.decode(q);
        let out_left = self.left.out_events(qx);
        let out_right = self.right.out_events(qy);
        (out_left & out_right) | (out_left & self.solo_left) | (out_right & self.solo_right)
    }

    /// The union of event labels of the product transitions arriving at `q`.
    pub(crate) fn inv_enabled(&self, q: StateId) -> EventSet {
        let (qx, qy) = self.decode(q);
        let in_left = self.left.in_events(qx);
        let in_right = self.right.in_events(qy);
        (in_left & in_right) | (in_left & self.solo_left) | (in_right & self.solo_right)
    }

    /// The product transition function. `None` when `event` is not enabled at `q`.
    pub(crate) fn delta(&self, q: StateId, event: Event) -> Option<StateId> {
        let (qx, qy) = self.decode(q);
        let in_left = self.left.alphabet().test(event);
        let in_right = self.right.alphabet().test(event);
        if in_left && in_right {
            let x = self.left.successor(qx, event)?;
            let y = self.right.successor(qy, event)?;
            Some(self.encode(x, y))
        } else if in_left {
            Some(self.encode(self.left.successor(qx, event)?, qy))
        } else if in_right {
            Some(self.encode(qx, self.right.successor(qy, event)?))
        } else {
            None
        }
    }

    /// The sources of all product transitions into `q` on `event`, ascending. For a
    /// shared event this is the cross product of the factor preimages, enumerated with
    /// the right factor outermost, which is exactly ascending encoded order. Requires
    /// both factors to have their inverse graphs allocated.
    pub(crate) fn preimages(&self, q: StateId, event: Event) -> Vec<StateId> {
        let (qx, qy) = self.decode(q);
        let in_left = self.left.alphabet().test(event);
        let in_right = self.right.alphabet().test(event);
        if in_left && in_right {
            let from_left = self.left.predecessors(qx, event);
            let from_right = self.right.predecessors(qy, event);
            let mut sources = Vec::with_capacity(from_left.len() * from_right.len());
            for &y in &from_right {
                for &x in &from_left {
                    sources.push(self.encode(x, y));
                }
            }
            sources
        } else if in_left {
            self.left
                .predecessors(qx, event)
                .into_iter()
                .map(|x| self.encode(x, qy))
                .collect()
        } else if in_right {
            self.right
                .predecessors(qy, event)
                .into_iter()
                .map(|y| self.encode(qx, y))
                .collect()
        } else {
            Vec::new()
        }
    }

    fn inverted_ready(&self) -> bool {
        self.left.is_inverted() && self.right.is_inverted()
    }

    fn check_state(&self, q: StateId) -> Result<StateId> {
        if q < self.size() {
            Ok(q)
        } else {
            Err(DesError::InvalidState {
                state: q,
                bound: self.size(),
            })
        }
    }

    /// Materializes the product as a concrete [`Automaton`].
    pub fn to_concrete(&self) -> Automaton {
        let all: Vec<StateId> = (0..self.size()).collect();
        self.materialize(&all)
    }

    /// Materializes the product restricted to the given ascending set of product
    /// states, renumbering them by their rank.
    ///
    /// A transition whose target falls outside the subset is pruned, and its event is
    /// stripped from the out-cache of the source; the in-caches are computed from the
    /// surviving edges. When the initial product state is not in the subset the result
    /// is the empty automaton.
    ///
    /// # Panics
    /// When `states` is not sorted, contains duplicates, or mentions an index outside
    /// the product.
    pub fn materialize(&self, states: &[StateId]) -> Automaton {
        assert!(
            states.windows(2).all(|w| w[0] < w[1]),
            "materialization subset must be ascending and duplicate free"
        );
        if let Some(&last) = states.last() {
            assert!(last < self.size(), "state {last} outside of the product");
        }
        let n = states.len();
        let Ok(initial) = states.binary_search(&self.initial) else {
            warn!("initial product state was pruned, result is the empty automaton");
            return Automaton::empty();
        };
        let marked: OrderedSet<StateId> = self
            .marked
            .iter()
            .filter_map(|m| states.binary_search(m).ok())
            .collect();

        let mut graph = SparseEventMatrix::new(n, n);
        let mut bits = SparseBitMatrix::new(n, n);
        let mut out_cache = vec![EventSet::default(); n];
        let mut in_cache = vec![EventSet::default(); n];
        for (rank, &q) in states.iter().enumerate() {
            bits.add(rank, rank);
            let enabled = self.enabled(q);
            let mut kept = enabled;
            for event in enabled.iter() {
                let target = self
                    .delta(q, event)
                    .expect("an enabled event has a product target");
                match states.binary_search(&target) {
                    Ok(target_rank) => {
                        graph.add(rank, target_rank, EventSet::singleton(event));
                        bits.add(target_rank, rank);
                        in_cache[target_rank].set(event);
                    }
                    Err(_) => kept.clear(event),
                }
            }
            out_cache[rank] = kept;
        }
        graph.seal();
        bits.seal();
        Automaton::from_parts(
            n,
            initial,
            marked,
            self.alphabet,
            graph,
            bits,
            out_cache,
            in_cache,
            AutomatonOptions::default(),
        )
    }
}

impl TransitionSystem for SyncProduct<'_> {
    fn size(&self) -> usize {
        self.left.size() * self.right.size()
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
        Ok(self.enabled(q))
    }

    fn inv_state_events(&self, q: StateId) -> Result<EventSet> {
        self.check_state(q)?;
        Ok(self.inv_enabled(q))
    }

    fn trans(&self, q: StateId, event: Event) -> Result<Option<StateId>> {
        self.check_state(q)?;
        EventSet::check(event)?;
        Ok(self.delta(q, event))
    }

    fn contains_inv_trans(&self, q: StateId, event: Event) -> Result<bool> {
        self.check_state(q)?;
        EventSet::check(event)?;
        if !self.inverted_ready() {
            return Err(DesError::NotPrepared);
        }
        Ok(!self.preimages(q, event).is_empty())
    }

    fn inv_trans(&self, q: StateId, event: Event) -> Result<Vec<StateId>> {
        self.check_state(q)?;
        EventSet::check(event)?;
        if !self.inverted_ready() {
            return Err(DesError::NotPrepared);
        }
        Ok(self.preimages(q, event))
    }
}
