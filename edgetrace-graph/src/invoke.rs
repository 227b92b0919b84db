// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use petgraph::stable_graph::NodeIndex;

use crate::method::MethodId;

/// One invocation site: a call instruction, the method it names statically, and the set of
/// methods dynamic dispatch actually resolved it to.
///
/// `target` is the statically-named callee (from `invokes.csv`); `call_targets` is the
/// (possibly empty, possibly multi-valued for virtual dispatch) resolution from
/// `targets.csv`. The two can differ: a call through an interface names the interface
/// method statically but resolves to one or more concrete overrides dynamically.
#[derive(Debug, Clone)]
pub struct Invoke {
    pub id: i64,
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub is_direct: bool,
    pub call_targets: Vec<NodeIndex>,
}

impl Invoke {
    pub(crate) fn new(id: i64, source: NodeIndex, target: NodeIndex, is_direct: bool) -> Self {
        Self {
            id,
            source,
            target,
            is_direct,
            call_targets: Vec::new(),
        }
    }
}

/// Row shape used only while streaming `invokes.csv`; resolved into an [`Invoke`] by the
/// builder once `MethodId` and `TargetId` have been looked up.
#[derive(Debug, Clone)]
pub(crate) struct InvokeRow {
    pub(crate) id: i64,
    pub(crate) method_id: MethodId,
    pub(crate) target_id: MethodId,
    pub(crate) is_direct: bool,
}
