// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drops supergraph edges whose target is already explained by a reachable equivalent in
//! the subgraph (§4.4).

use tracing::info;

use crate::graph::CallGraph;

/// Retains an edge `(s, t)` of `sup` iff `t`'s equivalent in `sub` is unset, or set but
/// unreachable. `sub` is only consulted for reachability; it is never mutated.
///
/// Must run after [`crate::equivalence::link`] has populated `sup`'s methods' `equivalent`
/// fields.
pub fn prune(sup: &mut CallGraph, sub: &CallGraph) {
    let to_remove: Vec<_> = sup
        .edges()
        .filter(|&(_s, t, _eix)| {
            match sup.method_at(t).equivalent {
                Some(sub_ix) => sub.method_at(sub_ix).is_reachable,
                None => false,
            }
        })
        .map(|(_s, _t, eix)| eix)
        .collect();

    let removed = to_remove.len();
    for eix in to_remove {
        sup.remove_edge(eix);
    }
    info!(removed, remaining = sup.edge_count(), "pruned already-explained edges");
}
