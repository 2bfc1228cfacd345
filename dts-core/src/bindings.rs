//! Binding schema index: which properties of which `compatible` are declared
//! to hold phandle references.
//!
//! Schema documents are devicetree binding YAML files. Only the reference
//! shape is extracted — `compatible` strings and phandle-typed property
//! names; no semantic validation happens here. A single malformed document
//! never fails a scan, only an unreadable root directory does.

use std::{
    collections::{HashMap, HashSet},
    fs, io,
    path::{Path, PathBuf},
};

use serde_yaml::Value;
use thiserror::Error;
use tracing::debug;

/// Error loading a bindings directory.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("failed to scan bindings directory {path}")]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Default)]
struct BindingEntry {
    props: HashSet<String>,
    /// Set when a `^pinctrl-` patternProperties entry is phandle-bearing;
    /// stands for "any pinctrl-* property".
    pinctrl_wildcard: bool,
}

/// Map from `compatible` string to the property names known to hold phandle
/// references. Independent of any particular tree; loaded once per schema
/// directory and reused across tree loads.
#[derive(Debug, Default)]
pub struct BindingIndex {
    entries: HashMap<String, BindingEntry>,
}

impl BindingIndex {
    /// Whether this compatible string has an entry at all.
    pub fn contains_compatible(&self, compatible: &str) -> bool {
        self.entries.contains_key(compatible)
    }

    /// Schema answer for a (compatible, property) pair: `None` when the
    /// compatible is unknown, otherwise the authoritative yes/no.
    pub fn is_phandle_property(&self, compatible: &str, prop: &str) -> Option<bool> {
        let entry = self.entries.get(compatible)?;
        Some(
            entry.props.contains(prop)
                || (entry.pinctrl_wildcard && prop.starts_with("pinctrl-")),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recursively scan `dir` for `.yaml`/`.yml` binding documents and build the
/// index. Unreadable subdirectories and unparseable documents are skipped
/// with a debug event; only an unreadable root is an error.
pub fn load_bindings(dir: &Path) -> Result<BindingIndex, BindingError> {
    let mut files = Vec::new();
    collect_yaml_files(dir, &mut files).map_err(|source| BindingError::Scan {
        path: dir.to_path_buf(),
        source,
    })?;
    files.sort();

    let mut index = BindingIndex::default();

    for path in files {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping unreadable binding document");
                continue;
            }
        };
        let doc: Value = match serde_yaml::from_str(&text) {
            Ok(doc) => doc,
            Err(err) => {
                debug!(path = %path.display(), %err, "skipping unparseable binding document");
                continue;
            }
        };
        if !doc.is_mapping() {
            continue;
        }

        let compatibles = extract_compatibles(doc.get("compatible"));
        if compatibles.is_empty() {
            continue;
        }

        let (props, pinctrl_wildcard) = extract_phandle_props(&doc);
        if props.is_empty() && !pinctrl_wildcard {
            continue;
        }

        for compatible in compatibles {
            let entry = index.entries.entry(compatible).or_default();
            entry.props.extend(props.iter().cloned());
            entry.pinctrl_wildcard |= pinctrl_wildcard;
        }
    }

    Ok(index)
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_dir() {
            // an unreadable subdirectory skips its contents, not the scan
            let _ = collect_yaml_files(&path, out);
        } else if matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        ) {
            out.push(path);
        }
    }
    Ok(())
}

/// Flatten a `compatible` schema section to its literal strings.
///
/// Accepts `const`, `enum` and nested `oneOf`/`anyOf`/`allOf` combinators;
/// deduplicated, order-preserving.
fn extract_compatibles(section: Option<&Value>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(section) = section {
        collect_compatibles(section, &mut out);
    }
    out
}

fn collect_compatibles(section: &Value, out: &mut Vec<String>) {
    if !section.is_mapping() {
        return;
    }
    if let Some(value) = section.get("const").and_then(Value::as_str) {
        push_unique(out, value);
    }
    if let Some(items) = section.get("enum").and_then(Value::as_sequence) {
        for item in items {
            if let Some(value) = item.as_str() {
                push_unique(out, value);
            }
        }
    }
    for key in ["oneOf", "anyOf", "allOf"] {
        if let Some(alternatives) = section.get(key).and_then(Value::as_sequence) {
            for alternative in alternatives {
                collect_compatibles(alternative, out);
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, value: &str) {
    if !out.iter().any(|existing| existing == value) {
        out.push(value.to_string());
    }
}

/// Collect the phandle-bearing property names declared by a document, plus
/// whether a `^pinctrl-` pattern property is phandle-bearing.
fn extract_phandle_props(doc: &Value) -> (HashSet<String>, bool) {
    let mut props = HashSet::new();
    let mut pinctrl_wildcard = false;

    if let Some(map) = doc.get("properties").and_then(Value::as_mapping) {
        for (name, schema) in map {
            if let Some(name) = name.as_str() {
                if schema_is_phandle(schema) {
                    props.insert(name.to_string());
                }
            }
        }
    }

    if let Some(map) = doc.get("patternProperties").and_then(Value::as_mapping) {
        for (pattern, schema) in map {
            let is_pinctrl = pattern
                .as_str()
                .is_some_and(|p| p.starts_with("^pinctrl-"));
            if is_pinctrl && schema_is_phandle(schema) {
                pinctrl_wildcard = true;
            }
        }
    }

    (props, pinctrl_wildcard)
}

/// A property schema is phandle-bearing when it references a phandle type
/// directly, when its sequence element type does, or when any combinator
/// branch does — evaluated recursively.
fn schema_is_phandle(schema: &Value) -> bool {
    if !schema.is_mapping() {
        return false;
    }
    if ref_is_phandle(schema.get("$ref")) {
        return true;
    }
    match schema.get("items") {
        Some(items @ Value::Mapping(_)) => {
            if schema_is_phandle(items) {
                return true;
            }
        }
        Some(Value::Sequence(items)) => {
            if items.iter().any(schema_is_phandle) {
                return true;
            }
        }
        _ => {}
    }
    ["oneOf", "anyOf", "allOf"].iter().any(|key| {
        schema
            .get(key)
            .and_then(Value::as_sequence)
            .is_some_and(|branches| branches.iter().any(schema_is_phandle))
    })
}

fn ref_is_phandle(reference: Option<&Value>) -> bool {
    reference
        .and_then(Value::as_str)
        .is_some_and(|r| r.contains("/phandle"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_binding(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).expect("write binding document");
    }

    #[test]
    fn const_compatible_with_phandle_array_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_binding(
            dir.path(),
            "example.yaml",
            r"
compatible:
  const: vendor,x
properties:
  clocks:
    items:
      - $ref: /schemas/types.yaml#/definitions/phandle-array
  status:
    enum: [okay, disabled]
",
        );

        let index = load_bindings(dir.path()).expect("load");
        assert_eq!(index.is_phandle_property("vendor,x", "clocks"), Some(true));
        assert_eq!(index.is_phandle_property("vendor,x", "status"), Some(false));
        assert_eq!(index.is_phandle_property("vendor,y", "clocks"), None);
    }

    #[test]
    fn enum_and_combinator_compatibles() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_binding(
            dir.path(),
            "multi.yaml",
            r"
compatible:
  oneOf:
    - const: vendor,a
    - enum:
        - vendor,b
        - vendor,c
properties:
  resets:
    $ref: /schemas/types.yaml#/definitions/phandle
",
        );

        let index = load_bindings(dir.path()).expect("load");
        for compatible in ["vendor,a", "vendor,b", "vendor,c"] {
            assert_eq!(
                index.is_phandle_property(compatible, "resets"),
                Some(true),
                "{compatible}"
            );
        }
    }

    #[test]
    fn pinctrl_pattern_registers_wildcard() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_binding(
            dir.path(),
            "pinctrl.yaml",
            r"
compatible:
  const: vendor,pins
patternProperties:
  '^pinctrl-[0-9]+$':
    $ref: /schemas/types.yaml#/definitions/phandle-array
",
        );

        let index = load_bindings(dir.path()).expect("load");
        assert_eq!(
            index.is_phandle_property("vendor,pins", "pinctrl-0"),
            Some(true)
        );
        assert_eq!(
            index.is_phandle_property("vendor,pins", "pinctrl-17"),
            Some(true)
        );
        assert_eq!(
            index.is_phandle_property("vendor,pins", "clocks"),
            Some(false)
        );
    }

    #[test]
    fn anyof_property_schema_branches() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_binding(
            dir.path(),
            "combinator.yaml",
            r"
compatible:
  const: vendor,z
properties:
  power-domains:
    anyOf:
      - $ref: /schemas/types.yaml#/definitions/phandle
      - items:
          $ref: /schemas/types.yaml#/definitions/phandle-array
",
        );

        let index = load_bindings(dir.path()).expect("load");
        assert_eq!(
            index.is_phandle_property("vendor,z", "power-domains"),
            Some(true)
        );
    }

    #[test]
    fn malformed_and_irrelevant_documents_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_binding(dir.path(), "broken.yaml", "{ not: [valid");
        write_binding(dir.path(), "nocompat.yaml", "properties: {clocks: {}}");
        write_binding(dir.path(), "notes.txt", "not a schema at all");
        write_binding(
            dir.path(),
            "good.yaml",
            r"
compatible:
  const: vendor,ok
properties:
  dmas:
    $ref: /schemas/types.yaml#/definitions/phandle-array
",
        );

        let index = load_bindings(dir.path()).expect("load");
        assert_eq!(index.len(), 1);
        assert_eq!(index.is_phandle_property("vendor,ok", "dmas"), Some(true));
    }

    #[test]
    fn documents_in_subdirectories_are_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("clock");
        fs::create_dir(&sub).expect("mkdir");
        write_binding(
            &sub,
            "nested.yml",
            r"
compatible:
  const: vendor,nested
properties:
  clocks:
    $ref: /schemas/types.yaml#/definitions/phandle-array
",
        );

        let index = load_bindings(dir.path()).expect("load");
        assert_eq!(
            index.is_phandle_property("vendor,nested", "clocks"),
            Some(true)
        );
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let missing = Path::new("/nonexistent/bindings/root");
        assert!(matches!(
            load_bindings(missing),
            Err(BindingError::Scan { .. })
        ));
    }
}
