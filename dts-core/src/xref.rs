//! Cross-reference index: phandle → node and label → path maps over one
//! parsed tree, and the reverse-reference ("who uses this node") query.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::classify::Classifier;
use crate::model::{NodeId, Tree};
use crate::value;

/// Derived phandle and symbol maps for a tree.
///
/// Built in one pre-order pass; remembers the tree generation it was built
/// at, so callers can tell when a structural edit has made it stale and a
/// rebuild is due before the next query.
#[derive(Debug)]
pub struct CrossRefIndex {
    phandles: IndexMap<u64, NodeId>,
    /// Label → absolute path, sourced from the `__symbols__` pseudo-node.
    symbols: HashMap<String, String>,
    generation: u64,
}

impl CrossRefIndex {
    /// Build the index from a tree.
    pub fn build(tree: &Tree) -> Self {
        let mut phandles = IndexMap::new();
        for id in tree.pre_order(tree.root()) {
            if let Some(phandle) = own_phandle(tree, id) {
                phandles.insert(phandle, id);
            }
        }

        let mut symbols = HashMap::new();
        let symbols_node = tree
            .children(tree.root())
            .iter()
            .copied()
            .find(|&child| tree.name(child) == "__symbols__");
        if let Some(node) = symbols_node {
            for (label, path) in tree.properties(node) {
                symbols.insert(label.to_string(), value::unquote(path).trim().to_string());
            }
        }

        Self {
            phandles,
            symbols,
            generation: tree.generation(),
        }
    }

    /// Whether the tree has been edited since this index was built.
    pub fn is_stale(&self, tree: &Tree) -> bool {
        tree.generation() != self.generation
    }

    /// The node owning this phandle, if any.
    pub fn node_by_phandle(&self, phandle: u64) -> Option<NodeId> {
        self.phandles.get(&phandle).copied()
    }

    /// The node's own phandle (first cell of its `phandle` property).
    pub fn phandle_of(&self, tree: &Tree, id: NodeId) -> Option<u64> {
        own_phandle(tree, id)
    }

    /// Resolve a label to a node via the symbols table.
    pub fn resolve_label(&self, tree: &Tree, label: &str) -> Option<NodeId> {
        self.symbols
            .get(label)
            .and_then(|path| tree.find_by_path(path))
    }

    /// The set of phandles a property value may reference: every integer
    /// cell, plus every `&label` token resolved to its target's phandle.
    /// Deduplicated, order-preserving.
    pub fn references_in(&self, tree: &Tree, property_value: &str) -> Vec<u64> {
        let mut refs = Vec::new();
        for cell in value::extract_cells(property_value) {
            if !refs.contains(&cell) {
                refs.push(cell);
            }
        }
        for label in value::label_refs(property_value) {
            if let Some(target) = self.resolve_label(tree, label) {
                if let Some(phandle) = own_phandle(tree, target) {
                    if !refs.contains(&phandle) {
                        refs.push(phandle);
                    }
                }
            }
        }
        refs
    }

    /// Nodes whose classified properties reference `target`.
    ///
    /// A node without a phandle cannot be referenced, so the result is empty.
    /// Each referencing node appears once, in pre-order; the first matching
    /// property short-circuits the rest of that node's properties.
    pub fn users_of(&self, tree: &Tree, classifier: &Classifier, target: NodeId) -> Vec<NodeId> {
        let Some(target_phandle) = own_phandle(tree, target) else {
            return Vec::new();
        };

        let mut users = Vec::new();
        for id in tree.pre_order(tree.root()) {
            if id == target {
                continue;
            }
            for (name, val) in tree.properties(id) {
                if !classifier.may_reference_phandle(tree, id, name) {
                    continue;
                }
                if self.references_in(tree, val).contains(&target_phandle) {
                    users.push(id);
                    break;
                }
            }
        }
        users
    }
}

fn own_phandle(tree: &Tree, id: NodeId) -> Option<u64> {
    tree.property(id, "phandle")
        .and_then(|raw| value::extract_cells(raw).into_iter().next())
}
