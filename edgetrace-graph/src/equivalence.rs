// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairs methods across two call graphs by equivalence key (§4.3).

use tracing::info;

use crate::graph::CallGraph;

/// Links every method of `sup` to its equivalent in `sub`, and vice versa, by
/// [`crate::method::Method::equivalence_key`]. A method with no matching key in the other
/// graph is left unlinked.
///
/// Two methods may be linked even if one (or both) is unreachable; reachability of the
/// partner only matters later, at pruning time.
///
/// When a graph has two methods with the same equivalence key, its `by_key` index only
/// remembers the later one (see `CallGraph::load`'s collision warning). Every method
/// sharing that key links to whichever node the *other* graph's index currently holds for
/// it, which for a colliding key is not necessarily a mutual pairing. This mirrors the
/// reference implementation rather than correcting it.
pub fn link(sup: &mut CallGraph, sub: &mut CallGraph) {
    let mut linked = 0usize;

    let sup_nodes: Vec<_> = sup.node_indices().collect();
    for sup_ix in sup_nodes {
        let key = sup.method_at(sup_ix).equivalence_key();
        if let Some(sub_ix) = sub.node_by_key(&key) {
            sup.method_at_mut(sup_ix).equivalent = Some(sub_ix);
            linked += 1;
        }
    }

    let sub_nodes: Vec<_> = sub.node_indices().collect();
    for sub_ix in sub_nodes {
        let key = sub.method_at(sub_ix).equivalence_key();
        if let Some(sup_ix) = sup.node_by_key(&key) {
            sub.method_at_mut(sub_ix).equivalent = Some(sup_ix);
        }
    }

    info!(linked, "linked equivalent methods across graphs");
}
