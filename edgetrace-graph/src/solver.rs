// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The iterative relevance-propagation loop (§4.5), plus the atomics it shares with a
//! caller-side progress supervisor (§5).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use tracing::info;

use crate::graph::CallGraph;

/// Propagation step size.
pub const ALPHA: f64 = 0.125;
/// Convergence threshold for the max-level stopping heuristic.
pub const EPSILON: f64 = 0.001;

/// Why the solver loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// `max_iterations` completed without the max-level dropping to `EPSILON`.
    MaxIterations,
    /// The max-level heuristic dropped to `EPSILON` or below.
    Converged,
    /// The caller's cancel flag was observed set.
    Cancelled,
}

/// Outcome of a solver run: how many iterations actually ran, and why it stopped.
#[derive(Debug, Clone, Copy)]
pub struct SolveReport {
    pub iterations: u64,
    pub termination: TerminationReason,
}

/// `level(m)` from the component design: a node's current value, overridden to zero for
/// methods that are "common ground" (their equivalent in the other graph is reachable) or
/// a "novel entry point" (no equivalent, but it's an entry point itself).
fn level(sup: &CallGraph, partner: &CallGraph, ix: NodeIndex) -> f64 {
    let method = sup.method_at(ix);
    match method.equivalent {
        Some(partner_ix) if partner.method_at(partner_ix).is_reachable => 0.0,
        None if method.is_entry_point => 0.0,
        _ => method.value,
    }
}

/// Runs the propagation loop on `sup`'s remaining edges against `sub`'s reachability, for
/// at most `max_iterations` iterations.
///
/// `iteration_count` is written (not just incremented in memory and flushed at the end) at
/// the end of every completed iteration, so a concurrent reader sampling it gets a
/// monotonically increasing view of real progress. `cancel_flag` is read once per
/// iteration; if it is already set when `solve` is called, zero iterations run and every
/// edge value stays at zero, per the "cancel before first iteration" boundary condition.
pub fn solve(
    sup: &mut CallGraph,
    sub: &CallGraph,
    max_iterations: u64,
    iteration_count: &AtomicU64,
    cancel_flag: &AtomicBool,
) -> SolveReport {
    info!(
        max_iterations,
        alpha = ALPHA,
        epsilon = EPSILON,
        "starting diff solver"
    );

    if cancel_flag.load(Ordering::Relaxed) {
        info!("cancelled before the first iteration");
        return SolveReport {
            iterations: 0,
            termination: TerminationReason::Cancelled,
        };
    }

    let edges: Vec<(NodeIndex, NodeIndex, EdgeIndex)> = sup.edges().collect();
    let mut iterations = 0u64;
    let mut termination = TerminationReason::MaxIterations;

    while iterations < max_iterations {
        let mut max_level = 0.0f64;
        for &(s, t, eix) in &edges {
            let l_t = level(sup, sub, t);
            let l_s = level(sup, sub, s);
            max_level = max_level.max(l_s).max(l_t);

            let d = ALPHA * (l_t - l_s);
            if d > 0.0 {
                sup.edge_weight_mut(eix).value += d;
                sup.method_at_mut(t).value -= d;
                sup.method_at_mut(s).value += d;
            }
        }

        iterations += 1;
        iteration_count.store(iterations, Ordering::Relaxed);

        if cancel_flag.load(Ordering::Relaxed) {
            termination = TerminationReason::Cancelled;
            break;
        }
        if max_level <= EPSILON {
            termination = TerminationReason::Converged;
            break;
        }
    }

    info!(iterations, ?termination, "diff solver finished");
    SolveReport {
        iterations,
        termination,
    }
}
