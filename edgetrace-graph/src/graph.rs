// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::Path;

use indexmap::IndexMap;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use tracing::{debug, info, warn};

use crate::edge::EdgeData;
use crate::errors::{EngineError, EngineResult, ReportTable};
use crate::invoke::Invoke;
use crate::method::{EquivalenceKey, Method, MethodId};
use crate::report;

/// One loaded call graph: every `Method`, `Invoke` and `Edge` parsed from a report
/// directory (or assembled directly through [`CallGraphBuilder`]), plus the indexes needed
/// to look methods up by id or by equivalence key and the closure of reachable methods
/// from the graph's entry points.
///
/// Backed by a `StableDiGraph` so that [`crate::prune::prune`] can drop edges by index
/// without disturbing the indices -- and, crucially, the first-insertion iteration order --
/// of the edges that survive. See `edges()`.
pub struct CallGraph {
    graph: StableDiGraph<Method, EdgeData, u32>,
    by_id: IndexMap<MethodId, NodeIndex>,
    by_key: IndexMap<EquivalenceKey, NodeIndex>,
    invokes: Vec<Invoke>,
    edge_index: IndexMap<(NodeIndex, NodeIndex), EdgeIndex>,
    reachable_count: usize,
}

impl CallGraph {
    /// Loads a call graph from a report directory containing `methods.csv`, `invokes.csv`
    /// and `targets.csv`.
    pub fn load(dir: &Path) -> EngineResult<CallGraph> {
        let method_rows = report::read_methods(dir)?;
        let mut graph = StableDiGraph::with_capacity(method_rows.len(), method_rows.len());
        let mut by_id = IndexMap::with_capacity(method_rows.len());
        let mut by_key = IndexMap::with_capacity(method_rows.len());

        for (offset, row) in method_rows.into_iter().enumerate() {
            let row_num = offset as u64 + 1;
            let method = Method::new(
                row.id,
                row.name,
                row.declared_type,
                row.parameters,
                row.return_type,
                row.flags,
                row.is_entry_point,
                row.display,
            );
            let key = method.equivalence_key();
            let node = graph.add_node(method);
            if by_id.insert(row.id, node).is_some() {
                return Err(EngineError::DuplicateId {
                    table: ReportTable::Methods,
                    row: row_num,
                    kind: "method",
                    id: row.id,
                });
            }
            if by_key.insert(key, node).is_some() {
                warn!(
                    id = row.id,
                    "equivalence key collision in methods table; the later method wins for linking"
                );
            }
        }

        let invoke_rows = report::read_invokes(dir)?;
        let mut invokes = Vec::with_capacity(invoke_rows.len());
        let mut invokes_by_id: IndexMap<i64, usize> = IndexMap::with_capacity(invoke_rows.len());
        for (offset, row) in invoke_rows.into_iter().enumerate() {
            let row_num = offset as u64 + 1;
            let source = *by_id.get(&row.method_id).ok_or(EngineError::DanglingRef {
                table: ReportTable::Invokes,
                row: row_num,
                referent: "method",
                id: row.method_id,
            })?;
            let target = *by_id.get(&row.target_id).ok_or(EngineError::DanglingRef {
                table: ReportTable::Invokes,
                row: row_num,
                referent: "target method",
                id: row.target_id,
            })?;
            let invoke_idx = invokes.len();
            invokes.push(Invoke::new(row.id, source, target, row.is_direct));
            if invokes_by_id.insert(row.id, invoke_idx).is_some() {
                return Err(EngineError::DuplicateId {
                    table: ReportTable::Invokes,
                    row: row_num,
                    kind: "invoke",
                    id: row.id,
                });
            }
        }

        let target_rows = report::read_targets(dir)?;
        let mut edge_index = IndexMap::new();
        for (offset, row) in target_rows.into_iter().enumerate() {
            let row_num = offset as u64 + 1;
            let invoke_idx = *invokes_by_id
                .get(&row.invoke_id)
                .ok_or(EngineError::DanglingRef {
                    table: ReportTable::Targets,
                    row: row_num,
                    referent: "invoke",
                    id: row.invoke_id,
                })?;
            let target_node = *by_id.get(&row.target_id).ok_or(EngineError::DanglingRef {
                table: ReportTable::Targets,
                row: row_num,
                referent: "method",
                id: row.target_id,
            })?;
            let source_node = invokes[invoke_idx].source;
            invokes[invoke_idx].call_targets.push(target_node);
            edge_index
                .entry((source_node, target_node))
                .or_insert_with(|| graph.add_edge(source_node, target_node, EdgeData::new()));
        }

        debug!(
            methods = by_id.len(),
            invokes = invokes.len(),
            edges = edge_index.len(),
            "built call graph from reports"
        );

        let mut call_graph = CallGraph {
            graph,
            by_id,
            by_key,
            invokes,
            edge_index,
            reachable_count: 0,
        };
        call_graph.compute_initial_reachability();
        Ok(call_graph)
    }

    /// Entry points first, then a fixed-point pass over edges in first-insertion order,
    /// then a final pass over invokes that catches statically-named targets a dynamic
    /// dispatch resolution never produced an edge for. See the component design's
    /// reachability closure.
    fn compute_initial_reachability(&mut self) {
        let mut count = 0usize;
        for ix in self.graph.node_indices().collect::<Vec<_>>() {
            if self.graph[ix].is_entry_point && self.graph[ix].mark_reachable() {
                count += 1;
            }
        }

        let pairs: Vec<(NodeIndex, NodeIndex)> = self
            .graph
            .edge_indices()
            .map(|eix| self.graph.edge_endpoints(eix).expect("edge index is valid"))
            .collect();
        loop {
            let mut changed = false;
            for &(s, t) in &pairs {
                if self.graph[s].is_reachable && self.graph[t].mark_reachable() {
                    count += 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        for invoke in &self.invokes {
            if self.graph[invoke.source].is_reachable && self.graph[invoke.target].mark_reachable() {
                count += 1;
            }
        }

        info!(reachable = count, methods = self.graph.node_count(), "computed reachability closure");
        self.reachable_count = count;
    }

    pub fn method_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn method(&self, id: MethodId) -> Option<&Method> {
        self.by_id.get(&id).map(|&ix| &self.graph[ix])
    }

    pub(crate) fn node_by_id(&self, id: MethodId) -> Option<NodeIndex> {
        self.by_id.get(&id).copied()
    }

    pub(crate) fn node_by_key(&self, key: &EquivalenceKey) -> Option<NodeIndex> {
        self.by_key.get(key).copied()
    }

    pub(crate) fn method_at(&self, ix: NodeIndex) -> &Method {
        &self.graph[ix]
    }

    pub(crate) fn method_at_mut(&mut self, ix: NodeIndex) -> &mut Method {
        &mut self.graph[ix]
    }

    pub(crate) fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Remaining edges, in first-insertion order. Pruning and the solver both rely on
    /// this order; see the component design's determinism requirement.
    pub(crate) fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, EdgeIndex)> + '_ {
        self.graph.edge_indices().map(move |eix| {
            let (s, t) = self.graph.edge_endpoints(eix).expect("edge index is valid");
            (s, t, eix)
        })
    }

    pub(crate) fn edge_weight(&self, eix: EdgeIndex) -> &EdgeData {
        &self.graph[eix]
    }

    pub(crate) fn edge_weight_mut(&mut self, eix: EdgeIndex) -> &mut EdgeData {
        &mut self.graph[eix]
    }

    /// Drops an edge from the graph's edge collection and from each endpoint's adjacency
    /// sets. The underlying `StableDiGraph` never reuses a removed edge's slot, so the
    /// insertion order of the edges that remain is unaffected.
    pub(crate) fn remove_edge(&mut self, eix: EdgeIndex) {
        if let Some((s, t)) = self.graph.edge_endpoints(eix) {
            self.edge_index.swap_remove(&(s, t));
        }
        self.graph.remove_edge(eix);
    }
}

/// Builds a [`CallGraph`] directly from methods and edges, for tests and other callers
/// that already have a graph in memory rather than a report directory on disk.
///
/// Methods are linked for equivalence purely by `(name, is_entry_point)`, since a
/// hand-built test graph has no reason to fill in `declared_type`/`parameters`/etc: two
/// methods with the same name in two different builders are "the same" method across the
/// diff, exactly as two scenarios in the component design describe.
#[derive(Default)]
pub struct CallGraphBuilder {
    graph: StableDiGraph<Method, EdgeData, u32>,
    by_id: IndexMap<MethodId, NodeIndex>,
    by_key: IndexMap<EquivalenceKey, NodeIndex>,
    invokes: Vec<Invoke>,
    edge_index: IndexMap<(NodeIndex, NodeIndex), EdgeIndex>,
    next_invoke_id: i64,
}

impl CallGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method node. `id` must be unique within this builder.
    pub fn add_method(&mut self, id: MethodId, name: &str, is_entry_point: bool) -> &mut Self {
        let method = Method::new(
            id,
            name.to_string(),
            String::new(),
            "empty".to_string(),
            String::new(),
            String::new(),
            is_entry_point,
            name.to_string(),
        );
        let key = method.equivalence_key();
        let node = self.graph.add_node(method);
        assert!(
            self.by_id.insert(id, node).is_none(),
            "duplicate method id {id} in CallGraphBuilder"
        );
        self.by_key.insert(key, node);
        self
    }

    /// Adds a call edge `source -> target`, plus the single invoke/target row pair that
    /// produces it. Both methods must already have been added.
    pub fn add_edge(&mut self, source: MethodId, target: MethodId) -> &mut Self {
        let source_ix = *self
            .by_id
            .get(&source)
            .unwrap_or_else(|| panic!("unknown method id {source} in CallGraphBuilder::add_edge"));
        let target_ix = *self
            .by_id
            .get(&target)
            .unwrap_or_else(|| panic!("unknown method id {target} in CallGraphBuilder::add_edge"));

        let mut invoke = Invoke::new(self.next_invoke_id, source_ix, target_ix, true);
        self.next_invoke_id += 1;
        invoke.call_targets.push(target_ix);
        self.invokes.push(invoke);

        self.edge_index
            .entry((source_ix, target_ix))
            .or_insert_with(|| self.graph.add_edge(source_ix, target_ix, EdgeData::new()));
        self
    }

    pub fn build(self) -> CallGraph {
        let mut call_graph = CallGraph {
            graph: self.graph,
            by_id: self.by_id,
            by_key: self.by_key,
            invokes: self.invokes,
            edge_index: self.edge_index,
            reachable_count: 0,
        };
        call_graph.compute_initial_reachability();
        call_graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_are_reachable_with_no_edges() {
        let graph = CallGraphBuilder::new().add_method(1, "main", true).build();
        assert_eq!(graph.reachable_count(), 1);
        assert!(graph.method(1).unwrap().is_reachable);
        assert_eq!(graph.method(1).unwrap().value, 1.0);
    }

    #[test]
    fn reachability_closes_over_a_chain() {
        let graph = CallGraphBuilder::new()
            .add_method(1, "a", true)
            .add_method(2, "b", false)
            .add_method(3, "c", false)
            .add_edge(1, 2)
            .add_edge(2, 3)
            .build();
        assert_eq!(graph.reachable_count(), 3);
        assert!(graph.method(3).unwrap().is_reachable);
    }

    #[test]
    fn unreachable_methods_stay_unreachable() {
        let graph = CallGraphBuilder::new()
            .add_method(1, "a", true)
            .add_method(2, "dead", false)
            .build();
        assert_eq!(graph.reachable_count(), 1);
        assert!(!graph.method(2).unwrap().is_reachable);
        assert_eq!(graph.method(2).unwrap().value, 0.0);
    }

    #[test]
    fn final_invoke_pass_marks_statically_named_target_without_an_edge() {
        // An invoke whose static target never got a row in targets.csv produces no Edge,
        // but the invoke's source is still reachable, so the final pass over invokes must
        // still mark the named target reachable.
        let mut builder = CallGraphBuilder::new();
        builder.add_method(1, "a", true).add_method(2, "b", false);
        let a = builder.by_id[&1];
        let b = builder.by_id[&2];
        builder.invokes.push(Invoke::new(100, a, b, true));
        // Deliberately no call_targets / no edge for this invoke.
        let graph = builder.build();
        assert!(graph.method(2).unwrap().is_reachable);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn duplicate_edges_collapse_to_one() {
        let mut builder = CallGraphBuilder::new();
        builder
            .add_method(1, "a", true)
            .add_method(2, "b", false)
            .add_edge(1, 2)
            .add_edge(1, 2);
        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
    }
}
