use std::collections::{BTreeMap, BTreeSet};

/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
pub type Set<S> = indexmap::IndexSet<S>;

/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
pub type Map<K, V> = indexmap::IndexMap<K, V>;

/// Type alias for sets that iterate in ascending order. State sets handed out by the
/// library are of this type so that iteration order is canonical.
pub type OrderedSet<S> = BTreeSet<S>;

/// Type alias for maps that iterate in ascending key order.
pub type OrderedMap<K, V> = BTreeMap<K, V>;
