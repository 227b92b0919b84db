// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The engine entry point: loads two reports, links and prunes them, runs the solver, and
//! emits the resulting edge map (§6).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64};

use crate::equivalence;
use crate::errors::EngineResult;
use crate::graph::CallGraph;
use crate::method::MethodId;
use crate::prune;
use crate::solver::{self, TerminationReason};

/// The value and relevance recorded for one supergraph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeResult {
    pub value: f64,
    pub relevant: bool,
}

/// `(source_id, target_id) -> { value, relevant }` for every surviving supergraph edge.
pub type EdgeMap = HashMap<(MethodId, MethodId), EdgeResult>;

/// Terminal result of a diff: the emitted edge map either way, tagged with whether the
/// solver ran to normal termination or was cancelled partway through.
///
/// Cancellation is not an error (see [`crate::errors::EngineError`]'s doc comment): a
/// cancelled diff still returns a valid, if less converged, edge map.
#[derive(Debug, Clone)]
pub enum DiffOutcome {
    Completed { edges: EdgeMap, iterations: u64 },
    Cancelled { edges: EdgeMap, iterations: u64 },
}

impl DiffOutcome {
    pub fn edges(&self) -> &EdgeMap {
        match self {
            DiffOutcome::Completed { edges, .. } => edges,
            DiffOutcome::Cancelled { edges, .. } => edges,
        }
    }

    pub fn iterations(&self) -> u64 {
        match self {
            DiffOutcome::Completed { iterations, .. } => *iterations,
            DiffOutcome::Cancelled { iterations, .. } => *iterations,
        }
    }

    pub fn was_cancelled(&self) -> bool {
        matches!(self, DiffOutcome::Cancelled { .. })
    }
}

/// Diffs the supergraph report at `sup_dir` against the subgraph report at `sub_dir`.
///
/// `iteration_count` is updated by the solver after every completed iteration; a caller
/// can sample it from another thread for progress display. `cancel_flag` can be set by a
/// caller (from another thread) to request cooperative cancellation; the solver finishes
/// its current iteration and returns a [`DiffOutcome::Cancelled`] with whatever values had
/// accumulated so far.
///
/// Both `CallGraph`s are scoped to this call and released on every exit path, including
/// the error paths from report loading.
pub fn diff(
    sup_dir: &Path,
    sub_dir: &Path,
    max_iterations: u64,
    iteration_count: &AtomicU64,
    cancel_flag: &AtomicBool,
) -> EngineResult<DiffOutcome> {
    let sup = CallGraph::load(sup_dir)?;
    let sub = CallGraph::load(sub_dir)?;
    Ok(diff_graphs(sup, sub, max_iterations, iteration_count, cancel_flag))
}

/// The same pipeline as [`diff`] (link, prune, solve, emit), starting from two already
/// loaded or already hand-built graphs rather than report directories. Exposed separately
/// so that callers -- and this crate's own tests -- can exercise the diff engine on graphs
/// assembled directly through [`CallGraphBuilder`][crate::graph::CallGraphBuilder].
pub fn diff_graphs(
    mut sup: CallGraph,
    mut sub: CallGraph,
    max_iterations: u64,
    iteration_count: &AtomicU64,
    cancel_flag: &AtomicBool,
) -> DiffOutcome {
    equivalence::link(&mut sup, &mut sub);
    prune::prune(&mut sup, &sub);

    let report = solver::solve(&mut sup, &sub, max_iterations, iteration_count, cancel_flag);
    let edges = emit(&sup);

    match report.termination {
        TerminationReason::Cancelled => DiffOutcome::Cancelled {
            edges,
            iterations: report.iterations,
        },
        TerminationReason::MaxIterations | TerminationReason::Converged => DiffOutcome::Completed {
            edges,
            iterations: report.iterations,
        },
    }
}

fn emit(sup: &CallGraph) -> EdgeMap {
    sup.edges()
        .map(|(s, t, eix)| {
            let source = sup.method_at(s);
            let target = sup.method_at(t);
            let result = EdgeResult {
                value: sup.edge_weight(eix).value,
                relevant: source.equivalent.is_some(),
            };
            ((source.id, target.id), result)
        })
        .collect()
}
