//! The textual value grammar shared by the parser, the cross-reference index
//! and the exporter.
//!
//! Property values are kept as raw source text; this module knows how to pick
//! integer cells, `&label` references and quoted strings back out of that text
//! without ever owning a structured representation of it. Anything it cannot
//! recognize is passed through unchanged, so malformed values degrade to
//! no-ops instead of data loss.

/// Parse a single integer token the way a C compiler would.
///
/// `0x`/`0X` selects base 16; a leading `0` followed by at least one more
/// digit selects base 8 (so `08` is rejected rather than read as decimal);
/// anything else is decimal.
pub fn parse_int(token: &str) -> Option<u64> {
    let (radix, digits) = if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        (16, hex)
    } else if token.len() > 1 && token.starts_with('0') {
        (8, &token[1..])
    } else {
        (10, token)
    };

    if digits.is_empty() {
        return None;
    }

    u64::from_str_radix(digits, radix).ok()
}

/// Collect the contents of every `<...>` cell group in a value.
///
/// Groups are non-nested; a `<` without a matching `>` ends the scan.
pub(crate) fn cell_groups(value: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                groups.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }

    groups
}

/// Extract every parseable integer cell from all `<...>` groups in a value.
pub fn extract_cells(value: &str) -> Vec<u64> {
    cell_groups(value)
        .into_iter()
        .flat_map(str::split_whitespace)
        .filter_map(parse_int)
        .collect()
}

/// Extract every `&label` token appearing anywhere in a value.
///
/// Labels follow the `[A-Za-z0-9_]` identifier rule; a lone `&` yields
/// nothing.
pub fn label_refs(value: &str) -> Vec<&str> {
    let mut refs = Vec::new();
    let mut rest = value;

    while let Some(pos) = rest.find('&') {
        let tail = &rest[pos + 1..];
        let end = tail
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(tail.len());
        if end > 0 {
            refs.push(&tail[..end]);
        }
        rest = &tail[end..];
    }

    refs
}

/// Rewrite the tokens of every `<...>` group through `rewrite`, leaving the
/// rest of the value byte-identical.
///
/// `rewrite` returns `Some(replacement)` to substitute a token or `None` to
/// keep it. A group in which no token was replaced is emitted with its
/// original spacing; a rewritten group re-joins its tokens with single
/// spaces. Text outside cell groups is never touched.
pub fn rewrite_cell_groups<F>(value: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    if !value.contains('<') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    loop {
        let Some(start) = rest.find('<') else {
            out.push_str(rest);
            break;
        };
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            out.push_str(rest);
            break;
        };

        out.push_str(&rest[..start]);

        let group = &after[..end];
        let mut changed = false;
        let tokens = group
            .split_whitespace()
            .map(|tok| match rewrite(tok) {
                Some(replacement) => {
                    changed = true;
                    replacement
                }
                None => tok.to_string(),
            })
            .collect::<Vec<_>>();

        out.push('<');
        if changed {
            out.push_str(&tokens.join(" "));
        } else {
            out.push_str(group);
        }
        out.push('>');

        rest = &after[end + 1..];
    }

    out
}

/// Strip the surrounding quotes from a simple quoted string value.
///
/// Values are stored raw, quotes included; this is the presentation-time
/// helper. Multi-string values (`"a", "b"`) and non-string values come back
/// unchanged.
pub fn unquote(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2
        && trimmed.starts_with('"')
        && trimmed.ends_with('"')
        && !trimmed[1..trimmed.len() - 1].contains('"')
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        value
    }
}

/// Extract every `"..."` segment from a value, quotes stripped.
///
/// Used to read `compatible` lists and `__symbols__` paths.
pub fn quoted_strings(value: &str) -> Vec<&str> {
    let mut strings = Vec::new();
    let mut rest = value;

    while let Some(start) = rest.find('"') {
        let after = &rest[start + 1..];
        match after.find('"') {
            Some(end) => {
                strings.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }

    strings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_c_style_integers() {
        for (input, exp) in [
            ("0", Some(0)),
            ("1", Some(1)),
            ("42", Some(42)),
            ("0x10", Some(0x10)),
            ("0X1f", Some(0x1f)),
            ("010", Some(8)),
            ("0755", Some(0o755)),
            ("08", None),
            ("0x", None),
            ("", None),
            ("&clk", None),
            ("GIC_SPI", None),
            ("1f", None),
        ] {
            assert_eq!(parse_int(input), exp, "token {input:?}");
        }
    }

    #[test]
    fn extract_cells_from_groups() {
        for (input, exp) in [
            ("<0x10 0>", vec![0x10, 0]),
            ("<1 2>, <3>", vec![1, 2, 3]),
            (r#""no cells here""#, vec![]),
            ("<&clk 4 GIC_SPI>", vec![4]),
            ("<0x10", vec![]),
        ] {
            assert_eq!(extract_cells(input), exp, "value {input:?}");
        }
    }

    #[test]
    fn extract_label_references() {
        for (input, exp) in [
            ("<&clk 0>", vec!["clk"]),
            ("&usart3", vec!["usart3"]),
            ("<&a &b>", vec!["a", "b"]),
            ("<1 2>", vec![]),
            ("& ", vec![]),
        ] {
            assert_eq!(label_refs(input), exp, "value {input:?}");
        }
    }

    #[test]
    fn rewrite_replaces_matching_tokens() {
        let out = rewrite_cell_groups("<0x10 0>", |tok| {
            (parse_int(tok) == Some(0x10)).then(|| "&clk_10".to_string())
        });
        assert_eq!(out, "<&clk_10 0>");
    }

    #[test]
    fn rewrite_keeps_untouched_groups_byte_identical() {
        // Irregular spacing must survive when nothing in the group changes.
        let value = "<0x101f3000 0x1000   0x101f4000 0x0010>";
        assert_eq!(rewrite_cell_groups(value, |_| None), value);

        // Non-group text is never touched.
        let mixed = r#"<1 2>, "a <string>""#;
        assert_eq!(rewrite_cell_groups(mixed, |_| None), mixed);
    }

    #[test]
    fn unquote_simple_strings_only() {
        assert_eq!(unquote(r#""okay""#), "okay");
        assert_eq!(unquote(r#""a", "b""#), r#""a", "b""#);
        assert_eq!(unquote("<0x10>"), "<0x10>");
        assert_eq!(unquote(r#""""#), "");
    }

    #[test]
    fn quoted_strings_extracts_all_segments() {
        assert_eq!(
            quoted_strings(r#""arm,pl011", "ns16550""#),
            vec!["arm,pl011", "ns16550"]
        );
        assert_eq!(quoted_strings("<0x10>"), Vec::<&str>::new());
    }
}
