use rand::Rng;

use crate::automaton::Automaton;
use crate::{Event, StateId};

/// Generates a random deterministic automaton of the given size. The algorithm is as
/// follows:
/// 1. Start with `size` states and no transitions; state 0 is initial.
/// 2. For each state and each of the `events` first event identifiers, draw a target
///    state and add the corresponding edge with probability `density`.
/// 3. Mark each state with probability `marked_density`.
///
/// Determinism holds by construction since every (state, event) pair is treated once.
/// Note that depending on the drawn transitions there may be unreachable states.
pub fn generate_random_automaton<R: Rng>(
    rng: &mut R,
    size: usize,
    events: Event,
    density: f64,
    marked_density: f64,
) -> Automaton {
    let marked: Vec<StateId> = (0..size)
        .filter(|_| rng.gen_bool(marked_density))
        .collect();
    let mut sys = Automaton::new(size, 0, marked);
    let mut edit = sys.edit();
    for q in 0..size {
        for event in 0..events {
            if rng.gen_bool(density) {
                let target = rng.gen_range(0..size);
                edit.insert(q, event, target)
                    .expect("each pair is drawn once");
            }
        }
    }
    drop(edit);
    sys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn samples() -> Vec<Automaton> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        (0..16usize)
            .map(|round| generate_random_automaton(&mut rng, 6 + round % 5, 4, 0.4, 0.3))
            .collect()
    }

    #[test]
    fn caches_always_match_the_graph() {
        for sys in samples() {
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
                for event in sys.state_events(q).unwrap().iter() {
                    assert!(sys.trans(q, event).unwrap().is_some());
                }
            }
        }
    }

    #[test]
    fn bit_graph_always_mirrors_the_edges() {
        for sys in samples() {
            for from in 0..sys.size() {
                for to in 0..sys.size() {
                    let expected = from == to || sys.graph().get(from, to).any();
                    assert_eq!(sys.bit_graph().get(to, from), expected);
                }
            }
        }
    }

    #[test]
    fn trim_is_idempotent_on_random_systems() {
        for sys in samples() {
            let once = sys.trim();
            let twice = once.trim();
            assert_eq!(once.size(), twice.size());
            assert_eq!(once.marked(), twice.marked());
            for q in 0..once.size() {
                for event in once.alphabet().iter() {
                    assert_eq!(once.trans(q, event).unwrap(), twice.trans(q, event).unwrap());
                }
            }
        }
    }

    #[test]
    fn synthesis_against_self_without_uncontrollables_is_trim() {
        for sys in samples() {
            let trimmed = sys.trim();
            let mut plant = sys.clone();
            let mut spec = sys.clone();
            let supervisor = supc(&mut plant, &mut spec, EventSet::default());
            assert_eq!(supervisor.size(), trimmed.size());
            for q in 0..trimmed.size() {
                assert_eq!(
                    supervisor.state_events(q).unwrap(),
                    trimmed.state_events(q).unwrap()
                );
            }
        }
    }
}
