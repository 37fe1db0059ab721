//! Reachability over the structural bit graph.
//!
//! A set of states is a sparse n×1 boolean column vector. One breadth-first step is the
//! boolean matrix product of the bit graph with that vector; because the bit graph
//! carries the identity diagonal, the support can only grow, so iterating the product
//! reaches a fixpoint after at most `n` steps: the closure of the seeds under the
//! edge relation.

use tracing::{trace, warn};

use crate::automaton::Automaton;
use crate::backend::{BoolGemm, HostGemm};
use crate::math::OrderedSet;
use crate::sparse::SparseBitMatrix;
use crate::system::TransitionSystem;
use crate::StateId;

/// The closure of `seeds` under the edge relation encoded by `bits` (which must carry
/// the identity diagonal for the iteration to be monotone).
fn closure<I: IntoIterator<Item = StateId>>(
    bits: &SparseBitMatrix,
    seeds: I,
) -> OrderedSet<StateId> {
    let gemm = HostGemm;
    let mut x = SparseBitMatrix::column_vector(bits.nrows(), seeds);
    let mut sweeps = 0usize;
    loop {
        let y = gemm.multiply(bits, &x);
        sweeps += 1;
        if y == x {
            break;
        }
        x = y;
    }
    trace!(sweeps, reached = x.nnz(), "reachability fixpoint");
    x.support().iter().copied().collect()
}

impl Automaton {
    /// The states reachable from the initial state.
    pub fn accessible_part(&self) -> OrderedSet<StateId> {
        if self.size() == 0 {
            return OrderedSet::new();
        }
        closure(self.bit_graph(), [self.initial()])
    }

    /// The states from which some marked state is reachable. All marked states are
    /// seeded at once; an automaton without marked states has no coaccessible part.
    pub fn coaccessible_part(&self) -> OrderedSet<StateId> {
        if self.size() == 0 {
            return OrderedSet::new();
        }
        closure(
            &self.bit_graph().transpose(),
            self.marked().iter().copied(),
        )
    }

    /// The states that are both accessible and coaccessible.
    pub fn trim_states(&self) -> OrderedSet<StateId> {
        let accessible = self.accessible_part();
        let coaccessible = self.coaccessible_part();
        accessible.intersection(&coaccessible).copied().collect()
    }

    /// Returns a new automaton restricted to the trim states, renumbered so that the
    /// retained states keep their ascending order. When the initial state is not trim
    /// the language is empty and the zero-state automaton is returned.
    pub fn trim(&self) -> Automaton {
        let keep: Vec<StateId> = self.trim_states().into_iter().collect();
        let Ok(initial) = keep.binary_search(&self.initial()) else {
            warn!("initial state is not trim, result is the empty automaton");
            return Automaton::with_options(0, 0, [], self.options());
        };
        let marked = self
            .marked()
            .iter()
            .filter_map(|m| keep.binary_search(m).ok())
            .collect::<Vec<_>>();
        let mut result = Automaton::with_options(keep.len(), initial, marked, self.options());
        let mut edit = result.edit();
        for (new_from, &old_from) in keep.iter().enumerate() {
            for (old_to, set) in self.graph().row(old_from) {
                let Ok(new_to) = keep.binary_search(&old_to) else {
                    continue;
                };
                for event in set.iter() {
                    edit.insert(new_from, event, new_to)
                        .expect("restriction preserves determinism");
                }
            }
        }
        drop(edit);
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    // the four state system of the basic usage example: a = 0, b = 1, g = 2
    fn scenario() -> Automaton {
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

    #[test_log::test]
    fn accessible_coaccessible_trim_states() {
        let sys = scenario();
        assert_eq!(sys.accessible_part(), (0..4).collect());
        assert_eq!(sys.coaccessible_part(), (0..3).collect());
        assert_eq!(sys.trim_states(), (0..3).collect());
    }

    #[test]
    fn trim_restricts_and_renumbers() {
        let sys = scenario();
        let trimmed = sys.trim();
        assert_eq!(trimmed.size(), 3);
        assert_eq!(trimmed.initial(), 0);
        assert_eq!(trimmed.marked().iter().copied().collect::<Vec<_>>(), vec![0, 2]);

        assert_eq!(trimmed.trans(0, 0).unwrap(), Some(0));
        assert_eq!(trimmed.trans(0, 2).unwrap(), Some(2));
        assert_eq!(trimmed.trans(1, 0).unwrap(), Some(0));
        assert_eq!(trimmed.trans(1, 1).unwrap(), Some(1));
        assert_eq!(trimmed.trans(2, 2).unwrap(), Some(1));
        assert_eq!(trimmed.trans(2, 1).unwrap(), Some(2));
        // the edge into the dropped state 3 is gone
        assert_eq!(trimmed.trans(2, 0).unwrap(), None);
        assert_eq!(trimmed.alphabet(), EventSet::from_events([0, 1, 2]));
    }

    #[test]
    fn trim_is_idempotent() {
        let trimmed = scenario().trim();
        let again = trimmed.trim();
        assert_eq!(again.size(), trimmed.size());
        assert_eq!(again.initial(), trimmed.initial());
        assert_eq!(again.marked(), trimmed.marked());
        for q in 0..trimmed.size() {
            for event in trimmed.alphabet().iter() {
                assert_eq!(again.trans(q, event).unwrap(), trimmed.trans(q, event).unwrap());
            }
        }
    }

    #[test]
    fn containment_invariants() {
        let sys = scenario();
        assert!(sys.accessible_part().contains(&sys.initial()));
        for m in sys.marked() {
            assert!(sys.coaccessible_part().contains(m));
        }
    }

    #[test]
    fn empty_marked_set_trims_to_nothing() {
        let mut sys = Automaton::new(2, 0, []);
        sys.edit().insert(0, 0, 1).unwrap();
        assert_eq!(sys.coaccessible_part().len(), 0);
        let trimmed = sys.trim();
        assert_eq!(trimmed.size(), 0);
        assert_eq!(trimmed.accessible_part().len(), 0);
    }

    #[test]
    fn unreachable_initial_state_gives_empty_result() {
        // no path from 0 to the only marked state
        let mut sys = Automaton::new(3, 0, [2]);
        sys.edit().insert(2, 0, 2).unwrap();
        assert_eq!(sys.trim().size(), 0);
    }

    #[test]
    fn isolated_initial_marked_state_survives() {
        let sys = Automaton::new(1, 0, [0]);
        assert_eq!(sys.trim().size(), 1);
        assert_eq!(sys.trim_states(), [0].into_iter().collect());
    }
}
