//! Device-tree source model and reference-resolution engine.
//!
//! Parses DTS/DTSI text into an in-memory node tree, classifies which
//! properties may hold phandle references (schema-driven when a binding
//! index is loaded, heuristic otherwise), answers reverse-reference
//! queries, and renders trees and subtrees back to text — rewriting
//! internal phandle references to symbolic labels on subtree export.
//!
//! The parser is deliberately tolerant: it never fails, and source it does
//! not understand (preprocessor directives, macros) degrades to ignored
//! statements rather than errors.
//!
//! ```
//! use dts_core::{export_subtree, parse, Classifier, CrossRefIndex};
//!
//! let tree = parse(
//!     "/ { provider: clk@0 { phandle = <0x10>; }; consumer@1 { clocks = <0x10 0>; }; };",
//! );
//!
//! let index = CrossRefIndex::build(&tree);
//! let provider = tree.find_by_path("/clk@0").unwrap();
//! let users = index.users_of(&tree, &Classifier::new(), provider);
//! assert_eq!(users.len(), 1);
//!
//! let text = export_subtree(&tree, tree.root());
//! assert!(text.contains("clocks = <&clk_10 0>;"));
//! ```

pub mod bindings;
pub mod classify;
pub mod export;
pub mod model;
pub mod parser;
pub mod value;
pub mod xref;

pub use bindings::{load_bindings, BindingError, BindingIndex};
pub use classify::Classifier;
pub use export::{export_subtree, serialize};
pub use model::{NodeId, Tree};
pub use parser::parse;
pub use xref::CrossRefIndex;
