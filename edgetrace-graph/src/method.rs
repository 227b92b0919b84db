// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use petgraph::stable_graph::NodeIndex;

/// The sentinel the report format uses to denote "no parameters".
const EMPTY_PARAMETERS: &str = "empty";
/// The normalized form `EMPTY_PARAMETERS` compares as in an equivalence key.
const NONE_PARAMETERS: &str = "none";

/// Integer id of a method, unique within the report it was read from.
///
/// Ids are only unique *within* one graph: the same id in the supergraph and the subgraph
/// name unrelated methods unless their [`EquivalenceKey`]s happen to match.
pub type MethodId = i64;

/// A node in a call graph: one statically-analyzed method.
///
/// `equivalent` is a relation, not ownership -- it names a node index in the *other*
/// graph of a diff, resolved by [`crate::equivalence::link`]. Nothing about a `Method` in
/// isolation tells you which graph its `equivalent` index belongs to; that's always the
/// graph paired with the one the method lives in.
#[derive(Debug, Clone)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    pub declared_type: String,
    pub parameters: String,
    pub return_type: String,
    pub flags: String,
    pub display: String,
    pub is_entry_point: bool,
    pub is_reachable: bool,
    pub value: f64,
    pub equivalent: Option<NodeIndex>,
}

impl Method {
    pub(crate) fn new(
        id: MethodId,
        name: String,
        declared_type: String,
        parameters: String,
        return_type: String,
        flags: String,
        is_entry_point: bool,
        display: String,
    ) -> Self {
        Self {
            id,
            name,
            declared_type,
            parameters,
            return_type,
            flags,
            is_entry_point,
            is_reachable: false,
            value: 0.0,
            display,
            equivalent: None,
        }
    }

    /// `parameters`, normalized the way the equivalence key compares it: the "empty"
    /// sentinel becomes "none", everything else passes through unchanged.
    pub fn normalized_parameters(&self) -> &str {
        if self.parameters == EMPTY_PARAMETERS {
            NONE_PARAMETERS
        } else {
            &self.parameters
        }
    }

    /// The composite key two methods are compared by to decide whether they're the "same"
    /// method across two independent analyses. `id` and `display` are deliberately excluded.
    pub fn equivalence_key(&self) -> EquivalenceKey {
        EquivalenceKey {
            name: self.name.clone(),
            declared_type: self.declared_type.clone(),
            parameters: self.normalized_parameters().to_string(),
            return_type: self.return_type.clone(),
            flags: self.flags.clone(),
            is_entry_point: self.is_entry_point,
        }
    }

    /// Marks this method reachable, giving it the initial unit value a reachability pass
    /// assigns to a newly-discovered node. No-op if already reachable.
    pub(crate) fn mark_reachable(&mut self) -> bool {
        if self.is_reachable {
            return false;
        }
        self.is_reachable = true;
        self.value = 1.0;
        true
    }
}

/// `(name, declared_type, parameters, return_type, flags, is_entry_point)`, the subset of a
/// method's attributes used to pair it with a method in the other graph of a diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EquivalenceKey {
    name: String,
    declared_type: String,
    parameters: String,
    return_type: String,
    flags: String,
    is_entry_point: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(parameters: &str) -> Method {
        Method::new(
            1,
            "doStuff".to_string(),
            "com.example.Foo".to_string(),
            parameters.to_string(),
            "void".to_string(),
            "public".to_string(),
            false,
            "Foo.doStuff()".to_string(),
        )
    }

    #[test]
    fn empty_sentinel_normalizes_to_none() {
        assert_eq!(method("empty").normalized_parameters(), "none");
    }

    #[test]
    fn non_empty_parameters_pass_through() {
        assert_eq!(method("int,java.lang.String").normalized_parameters(), "int,java.lang.String");
    }

    #[test]
    fn equivalence_key_ignores_id_and_display() {
        let mut a = method("empty");
        let mut b = method("empty");
        a.id = 1;
        b.id = 2;
        a.display = "Foo.doStuff() [#1]".to_string();
        b.display = "Foo.doStuff() [#2]".to_string();
        assert_eq!(a.equivalence_key(), b.equivalence_key());
    }

    #[test]
    fn equivalence_key_merges_empty_sentinel_and_literal_none() {
        let a = method("empty");
        let b = method("none");
        assert_eq!(a.equivalence_key(), b.equivalence_key());
    }

    #[test]
    fn equivalence_key_sensitive_to_declared_type() {
        let mut a = method("empty");
        let mut b = method("empty");
        b.declared_type = "com.example.Bar".to_string();
        assert_ne!(a.equivalence_key(), b.equivalence_key());
        a.declared_type = "com.example.Bar".to_string();
        assert_eq!(a.equivalence_key(), b.equivalence_key());
    }

    #[test]
    fn mark_reachable_sets_unit_value_once() {
        let mut m = method("empty");
        assert!(m.mark_reachable());
        assert_eq!(m.value, 1.0);
        m.value = 0.3;
        assert!(!m.mark_reachable());
        assert_eq!(m.value, 0.3, "marking an already-reachable method must not reset its value");
    }
}
