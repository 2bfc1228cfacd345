//! Subtree exporter and full-tree serializer.
//!
//! The exporter renders one node and its descendants as a self-contained
//! DTSI fragment: nodes that own a phandle get a synthesized label, the
//! `phandle` property itself is dropped, and numeric cells matching an
//! in-subtree phandle are rewritten to `&label` references. Phandles owned
//! outside the subtree are invisible to the rewrite and stay as raw
//! numerals. The serializer uses the same emission with none of the
//! rewriting, for persisting in-place edits.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use indexmap::IndexMap;

use crate::model::{NodeId, Tree};
use crate::value;

const INDENT: &str = "  ";

/// Export the subtree rooted at `root` as DTSI text.
///
/// Deterministic: labels are assigned in subtree pre-order, keyed by phandle,
/// so the same input always produces byte-identical output.
pub fn export_subtree(tree: &Tree, root: NodeId) -> String {
    let nodes = tree.pre_order(root);

    // phandle -> node, restricted to the subtree
    let mut phandles: IndexMap<u64, NodeId> = IndexMap::new();
    for &id in &nodes {
        if let Some(phandle) = first_phandle_cell(tree, id) {
            phandles.insert(phandle, id);
        }
    }

    let labels = assign_labels(tree, &phandles);

    let mut out = String::new();
    write_export(tree, root, 0, &phandles, &labels, &mut out);
    out
}

/// Render the whole tree back to DTS text.
///
/// Properties (the `phandle` identity included) are emitted verbatim; no
/// labels are synthesized. Re-parsing the output reproduces the same tree
/// shape, though not the original formatting.
pub fn serialize(tree: &Tree) -> String {
    let mut out = String::new();
    write_plain(tree, tree.root(), 0, &mut out);
    out
}

/// Synthesize a stable label for every phandle-owning node.
///
/// The label derives from the node name: the `@unit-address` suffix is
/// dropped, anything outside `[A-Za-z0-9_]` becomes `_`, a leading `_` is
/// added unless the result starts with a letter or underscore, and the
/// phandle in hex is appended for stability. Residual collisions take an
/// incrementing numeric suffix.
fn assign_labels(tree: &Tree, phandles: &IndexMap<u64, NodeId>) -> HashMap<NodeId, String> {
    let mut labels = HashMap::new();
    let mut used = HashSet::new();

    for (&phandle, &id) in phandles {
        let base = sanitize_label(tree.name(id));
        let mut candidate = format!("{base}_{phandle:x}");
        let mut n = 1;
        while !used.insert(candidate.clone()) {
            n += 1;
            candidate = format!("{base}_{phandle:x}_{n}");
        }
        labels.insert(id, candidate);
    }

    labels
}

fn sanitize_label(name: &str) -> String {
    let base = name.split('@').next().unwrap_or(name);
    let mut label: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !label.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        label.insert(0, '_');
    }
    label
}

fn write_export(
    tree: &Tree,
    id: NodeId,
    level: usize,
    phandles: &IndexMap<u64, NodeId>,
    labels: &HashMap<NodeId, String>,
    out: &mut String,
) {
    let pad = INDENT.repeat(level);

    match labels.get(&id) {
        Some(label) => {
            let _ = writeln!(out, "{pad}{label}: {} {{", tree.name(id));
        }
        None => {
            let _ = writeln!(out, "{pad}{} {{", tree.name(id));
        }
    }

    for (name, val) in tree.properties(id) {
        if name == "phandle" {
            continue;
        }
        let rewritten = rewrite_references(val, phandles, labels);
        let _ = writeln!(out, "{pad}{INDENT}{name} = {rewritten};");
    }

    for &child in tree.children(id) {
        write_export(tree, child, level + 1, phandles, labels, out);
    }

    let _ = writeln!(out, "{pad}}};");
}

/// Rewrite integer cells matching an in-subtree phandle to `&label`.
///
/// Tokens that do not parse, or parse but match no in-subtree phandle
/// (external references), pass through unchanged; text outside `<...>`
/// groups is never touched.
fn rewrite_references(
    val: &str,
    phandles: &IndexMap<u64, NodeId>,
    labels: &HashMap<NodeId, String>,
) -> String {
    value::rewrite_cell_groups(val, |token| {
        let phandle = value::parse_int(token)?;
        let id = phandles.get(&phandle)?;
        labels.get(id).map(|label| format!("&{label}"))
    })
}

fn first_phandle_cell(tree: &Tree, id: NodeId) -> Option<u64> {
    tree.property(id, "phandle")
        .and_then(|raw| value::extract_cells(raw).into_iter().next())
}

fn write_plain(tree: &Tree, id: NodeId, level: usize, out: &mut String) {
    let pad = INDENT.repeat(level);

    let _ = writeln!(out, "{pad}{} {{", tree.name(id));
    for (name, val) in tree.properties(id) {
        let _ = writeln!(out, "{pad}{INDENT}{name} = {val};");
    }
    for &child in tree.children(id) {
        write_plain(tree, child, level + 1, out);
    }
    let _ = writeln!(out, "{pad}}};");
}
