//! Graphviz export.

use itertools::Itertools;

use crate::automaton::Automaton;
use crate::system::TransitionSystem;

impl Automaton {
    /// Computes the graphviz representation of the automaton. Marked states are drawn
    /// with a double circle and the initial state receives an entry arrow from a hidden
    /// node; edges carry the list of their events. For more information on the DOT
    /// format, see the [graphviz documentation](https://graphviz.org/doc/info/lang.html).
    pub fn dot_representation(&self) -> String {
        let header = [
            "digraph A {".to_string(),
            "rankdir=LR".to_string(),
            "init [shape=none, label=\"\"]".to_string(),
            format!("init -> q{}", self.initial()),
        ];

        let states = (0..self.size()).map(|q| {
            let shape = if self.marked().contains(&q) {
                "doublecircle"
            } else {
                "circle"
            };
            format!("q{q} [shape={shape}, label=\"{q}\"]")
        });

        let transitions = (0..self.size()).flat_map(|from| {
            self.graph().row(from).map(move |(to, events)| {
                format!(
                    "q{from} -> q{to} [label=\"{}\"]",
                    events.iter().map(|e| e.to_string()).join(",")
                )
            })
        });

        header
            .into_iter()
            .chain(states)
            .chain(transitions)
            .chain(std::iter::once("}".to_string()))
            .join("\n")
    }
}
