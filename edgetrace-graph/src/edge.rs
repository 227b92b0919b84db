// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Weight of a directed arc `source -> target` in a [`crate::graph::CallGraph`].
///
/// `value` starts at zero and is only ever increased by the solver (see
/// [`crate::solver::solve`]); it never decreases once written.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeData {
    pub value: f64,
}

impl EdgeData {
    pub(crate) fn new() -> Self {
        Self { value: 0.0 }
    }
}
