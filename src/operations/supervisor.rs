use tracing::{debug, trace};

use crate::automaton::Automaton;
use crate::events::EventSet;
use crate::math::{OrderedSet, Set};
use crate::operations::sync::{sync_lazy, SyncProduct};
use crate::system::TransitionSystem;
use crate::StateId;

/// Synthesizes the monolithic supervisor for a plant and a specification.
///
/// The result is the trim recognizer of the supremal controllable sublanguage of
/// `L(spec) ∩ L(plant)` with respect to `plant` and the uncontrollable events: the
/// largest behavior within the specification that a supervisor can enforce by disabling
/// only controllable events. Identifiers in `uncontrollable` that are not part of either
/// alphabet are silently ignored.
///
/// The synthesis explores the lazy composition `plant ∥ spec` depth first. A visited
/// product state is *bad* when the plant offers an uncontrollable event that the
/// composition does not enable, i.e. the specification would have to disable an event it
/// legally cannot. Bad states are pruned together with every state from which an
/// uncontrollable string leads into them, by walking inverse transitions restricted to
/// uncontrollable events. The retained states are materialized and trimmed.
///
/// The factor automata are borrowed mutably because their inverse graphs are allocated
/// for the duration of the synthesis and released before returning.
pub fn supc(plant: &mut Automaton, spec: &mut Automaton, uncontrollable: EventSet) -> Automaton {
    plant.allocate_inverted();
    spec.allocate_inverted();
    let shaped = explore(&sync_lazy(plant, spec), plant, uncontrollable);
    plant.clear_inverted();
    spec.clear_inverted();
    shaped.trim()
}

fn explore(product: &SyncProduct<'_>, plant: &Automaton, uncontrollable: EventSet) -> Automaton {
    if product.size() == 0 {
        return product.materialize(&[]);
    }
    let unc_plant = uncontrollable & plant.alphabet();
    let unc_product = uncontrollable & product.alphabet();

    let mut retained: OrderedSet<StateId> = OrderedSet::new();
    let mut removed: Set<StateId> = Set::default();
    let mut frontier = vec![product.initial()];
    while let Some(q) = frontier.pop() {
        if retained.contains(&q) || removed.contains(&q) {
            continue;
        }
        let (qx, _) = product.decode(q);
        let enabled = product.enabled(q);
        let forced = unc_plant & plant.out_events(qx);
        if !forced.is_subset(&enabled) {
            trace!(state = q, "uncontrollable event blocked, pruning");
            remove_bad_states(product, q, unc_product, &mut retained, &mut removed);
            continue;
        }
        retained.insert(q);
        for event in enabled.iter() {
            let successor = product
                .delta(q, event)
                .expect("an enabled event has a product target");
            if !retained.contains(&successor) && !removed.contains(&successor) {
                frontier.push(successor);
            }
        }
    }
    debug!(
        retained = retained.len(),
        removed = removed.len(),
        "supervisor exploration finished"
    );
    let keep: Vec<StateId> = retained.into_iter().collect();
    product.materialize(&keep)
}

/// Prunes `bad` and, transitively against the direction of uncontrollable transitions,
/// every state that can reach it by an uncontrollable string: such a state would be
/// carried into badness without the supervisor being able to intervene.
fn remove_bad_states(
    product: &SyncProduct<'_>,
    bad: StateId,
    uncontrollable: EventSet,
    retained: &mut OrderedSet<StateId>,
    removed: &mut Set<StateId>,
) {
    let mut stack = vec![bad];
    removed.insert(bad);
    while let Some(q) = stack.pop() {
        retained.remove(&q);
        let follow = product.inv_enabled(q) & uncontrollable;
        for event in follow.iter() {
            for source in product.preimages(q, event) {
                if removed.insert(source) {
                    stack.push(source);
                }
            }
        }
    }
}
