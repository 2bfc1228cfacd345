//! The in-memory device tree: an index-based arena of named nodes.
//!
//! Parent links are plain indices rather than owning references, so the tree
//! stays a single-owner structure with no reference cycles. Node ids are only
//! meaningful for the tree that issued them.

use indexmap::IndexMap;

/// Handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    path: String,
    properties: IndexMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// A device tree rooted at the synthetic `/` node.
///
/// Structural edits (rename, delete, property changes) bump an internal
/// generation counter; derived indices remember the generation they were
/// built at and must be rebuilt once [`Tree::generation`] has moved on.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    generation: u64,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Creates an empty tree containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "/".to_string(),
                path: "/".to_string(),
                properties: IndexMap::new(),
                children: Vec::new(),
                parent: None,
            }],
            generation: 0,
        }
    }

    /// Returns the id of the root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends a new child under `parent` and returns its id.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let name = name.into();
        let path = join_path(&self.nodes[parent.0].path, &name);
        let id = NodeId(self.nodes.len());

        self.nodes.push(Node {
            name,
            path,
            properties: IndexMap::new(),
            children: Vec::new(),
            parent: Some(parent),
        });
        self.nodes[parent.0].children.push(id);
        self.generation += 1;

        id
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// Absolute slash-separated path of the node.
    pub fn path(&self, id: NodeId) -> &str {
        &self.nodes[id.0].path
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children in source declaration order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Looks up a single property value.
    pub fn property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].properties.get(name).map(String::as_str)
    }

    /// Iterates over the node's properties in declaration order.
    pub fn properties(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes[id.0]
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sets a property, overwriting any previous value in place at its
    /// original position.
    pub fn set_property(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        self.nodes[id.0].properties.insert(name.into(), value.into());
        self.generation += 1;
    }

    /// Removes a property, keeping the order of the remaining ones. Returns
    /// whether the property existed.
    pub fn remove_property(&mut self, id: NodeId, name: &str) -> bool {
        let removed = self.nodes[id.0].properties.shift_remove(name).is_some();
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Renames a node and recomputes the paths of its whole subtree.
    ///
    /// Renaming the root is a no-op; its name and path are always `/`.
    pub fn rename(&mut self, id: NodeId, new_name: impl Into<String>) {
        if self.nodes[id.0].parent.is_none() {
            return;
        }
        self.nodes[id.0].name = new_name.into();
        self.recompute_paths(id);
        self.generation += 1;
    }

    /// Detaches a node (and its descendants) from the tree.
    ///
    /// Deleting the root is a no-op. The detached nodes stay in the arena but
    /// are no longer reachable by traversal or path lookup.
    pub fn delete_subtree(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        self.nodes[parent.0].children.retain(|&child| child != id);
        self.nodes[id.0].parent = None;
        self.generation += 1;
    }

    /// Finds a node by its absolute path.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.pre_order(self.root())
            .into_iter()
            .find(|&id| self.nodes[id.0].path == path)
    }

    /// Collects the subtree under `from` in pre-order (including `from`),
    /// children in declaration order.
    pub fn pre_order(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            order.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }

        order
    }

    /// Number of reachable nodes, root included.
    pub fn node_count(&self) -> usize {
        self.pre_order(self.root()).len()
    }

    /// Monotonic edit counter used for index invalidation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn recompute_paths(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            let path = join_path(&self.nodes[parent.0].path.clone(), &self.nodes[id.0].name);
            self.nodes[id.0].path = path;
        }
        for child in self.nodes[id.0].children.clone() {
            self.recompute_paths(child);
        }
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let soc = tree.add_child(tree.root(), "soc");
        let uart = tree.add_child(soc, "uart@fe001000");
        (tree, soc, uart)
    }

    #[test]
    fn paths_follow_ancestry() {
        let (tree, soc, uart) = sample();

        assert_eq!(tree.path(tree.root()), "/");
        assert_eq!(tree.path(soc), "/soc");
        assert_eq!(tree.path(uart), "/soc/uart@fe001000");
        assert_eq!(tree.find_by_path("/soc/uart@fe001000"), Some(uart));
        assert_eq!(tree.find_by_path("/nope"), None);
    }

    #[test]
    fn rename_recomputes_subtree_paths() {
        let (mut tree, soc, uart) = sample();

        tree.rename(soc, "bus");
        assert_eq!(tree.path(soc), "/bus");
        assert_eq!(tree.path(uart), "/bus/uart@fe001000");

        // root rename is a no-op
        tree.rename(tree.root(), "x");
        assert_eq!(tree.name(tree.root()), "/");
    }

    #[test]
    fn delete_subtree_detaches_nodes() {
        let (mut tree, soc, uart) = sample();

        tree.delete_subtree(soc);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.find_by_path("/soc"), None);
        assert_eq!(tree.find_by_path("/soc/uart@fe001000"), None);
        assert_eq!(tree.parent(soc), None);

        // deleting the root is refused
        tree.delete_subtree(tree.root());
        assert_eq!(tree.node_count(), 1);
        let _ = uart;
    }

    #[test]
    fn property_overwrite_keeps_position() {
        let (mut tree, soc, _) = sample();

        tree.set_property(soc, "compatible", r#""simple-bus""#);
        tree.set_property(soc, "ranges", "<0>");
        tree.set_property(soc, "compatible", r#""other-bus""#);

        let props: Vec<_> = tree.properties(soc).collect();
        assert_eq!(
            props,
            vec![("compatible", r#""other-bus""#), ("ranges", "<0>")]
        );

        assert!(tree.remove_property(soc, "ranges"));
        assert!(!tree.remove_property(soc, "ranges"));
    }

    #[test]
    fn edits_bump_generation() {
        let (mut tree, soc, _) = sample();

        let before = tree.generation();
        tree.set_property(soc, "status", r#""disabled""#);
        assert!(tree.generation() > before);

        let before = tree.generation();
        tree.rename(soc, "bus");
        assert!(tree.generation() > before);

        let before = tree.generation();
        tree.delete_subtree(soc);
        assert!(tree.generation() > before);
    }

    #[test]
    fn pre_order_is_declaration_order() {
        let mut tree = Tree::new();
        let a = tree.add_child(tree.root(), "a");
        let b = tree.add_child(tree.root(), "b");
        let a1 = tree.add_child(a, "a1");

        assert_eq!(tree.pre_order(tree.root()), vec![tree.root(), a, a1, b]);
    }
}
