//! Reference classifier: may the cells of a given property encode phandle
//! references?
//!
//! Two tiers: precise schema knowledge from a loaded [`BindingIndex`] is
//! authoritative when the node's `compatible` is known there; otherwise a
//! static heuristic rule set keeps the engine usable with no schema data at
//! all.

use crate::bindings::BindingIndex;
use crate::model::{NodeId, Tree};
use crate::value;

/// Property names whose cells conventionally hold phandle references.
const REFERENCE_PROPERTIES: &[&str] = &[
    "interrupt-parent",
    "clocks",
    "dmas",
    "pinctrl-0",
    "pinctrl-1",
    "pinctrl-2",
    "iommus",
    "assigned-clocks",
    "assigned-clock-parents",
    "resets",
    "gpios",
    "interrupts-extended",
    "phys",
    "power-domains",
    "memory-region",
    "thermal-sensors",
    "remote-endpoint",
    "sound-dai",
    "phy-handle",
    "phy",
];

/// Property name suffixes that mark phandle references.
const REFERENCE_SUFFIXES: &[&str] = &["-supply", "-gpios", "-gpio", "-phandle", "-phandles"];

/// Decides whether a property may reference phandles.
#[derive(Debug, Default)]
pub struct Classifier {
    bindings: Option<BindingIndex>,
}

impl Classifier {
    /// A classifier running on heuristics alone.
    pub fn new() -> Self {
        Self::default()
    }

    /// A classifier consulting `bindings` before falling back to heuristics.
    pub fn with_bindings(bindings: BindingIndex) -> Self {
        Self {
            bindings: Some(bindings),
        }
    }

    pub fn bindings(&self) -> Option<&BindingIndex> {
        self.bindings.as_ref()
    }

    /// Whether the cells of `prop` on `node` may encode phandle references.
    ///
    /// `phandle` and `linux,phandle` declare the node's own identity and are
    /// never references. If a loaded binding entry matches one of the node's
    /// `compatible` strings, its answer is final; otherwise the static rule
    /// set applies.
    pub fn may_reference_phandle(&self, tree: &Tree, node: NodeId, prop: &str) -> bool {
        if prop == "phandle" || prop == "linux,phandle" {
            return false;
        }

        if let Some(bindings) = &self.bindings {
            for compatible in node_compatibles(tree, node) {
                if let Some(answer) = bindings.is_phandle_property(compatible, prop) {
                    return answer;
                }
            }
        }

        heuristic(prop)
    }
}

fn heuristic(prop: &str) -> bool {
    REFERENCE_PROPERTIES.contains(&prop)
        || REFERENCE_SUFFIXES.iter().any(|suffix| prop.ends_with(suffix))
        || prop.starts_with("pinctrl-")
}

/// The node's `compatible` strings in declaration order.
///
/// Values are stored raw; a quoted list yields its strings, an unquoted
/// value (a macro, say) is taken whole.
fn node_compatibles(tree: &Tree, node: NodeId) -> Vec<&str> {
    let Some(raw) = tree.property(node, "compatible") else {
        return Vec::new();
    };
    let strings = value::quoted_strings(raw);
    if strings.is_empty() && !raw.trim().is_empty() {
        vec![raw.trim()]
    } else {
        strings
    }
}
