//! Tolerant recursive-descent parser for DTS/DTSI source text.
//!
//! The grammar understood here is intentionally partial: real-world sources
//! carry preprocessor macros, includes and directives this engine does not
//! expand. The parser therefore never fails — statements it cannot recognize
//! are dropped, unmatched closing braces are no-ops, and garbage input yields
//! a degenerate (possibly empty) tree rather than an error.

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt},
    sequence::{delimited, preceded, separated_pair},
    Finish, IResult,
};
use tracing::trace;

use crate::model::Tree;

/// Parse DTS source text into a [`Tree`]. Never fails.
pub fn parse(text: &str) -> Tree {
    let mut tree = Tree::new();
    let root = tree.root();
    let mut stack = vec![root];

    for stmt in statements(text) {
        let top = stack.last().copied().unwrap_or(root);

        if stmt.ends_with('{') {
            // '/ {' (or any path-rooted opener) re-enters the root scope,
            // which already exists.
            if stmt.starts_with('/') {
                continue;
            }
            let name = node_open(&stmt).unwrap_or("node");
            stack.push(tree.add_child(top, name));
        } else if stmt == "};" {
            if stack.len() > 1 {
                stack.pop();
            }
        } else if let Some((name, value)) = property(&stmt) {
            tree.set_property(top, name, value);
        } else {
            trace!(statement = %stmt, "ignoring unrecognized statement");
        }
    }

    tree
}

/// Re-flow source text into logical statements.
///
/// A statement ends at `{` or `;`, wherever that falls — mid-line statements
/// are split apart and statements wrapped across physical lines are joined
/// with single spaces. Quoted strings shield `{` and `;` from splitting.
fn statements(text: &str) -> Vec<String> {
    let text = strip_comments(text);
    let mut stmts = Vec::new();
    let mut buf = String::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !buf.is_empty() && !buf.ends_with(' ') {
            buf.push(' ');
        }

        let mut in_string = false;
        for ch in line.chars() {
            buf.push(ch);
            match ch {
                '"' => in_string = !in_string,
                '{' | ';' if !in_string => {
                    let stmt = buf.trim().to_string();
                    if !stmt.is_empty() {
                        stmts.push(stmt);
                    }
                    buf.clear();
                }
                _ => {}
            }
        }
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        stmts.push(tail.to_string());
    }

    stmts
}

/// Remove `/* ... */` and `// ...` comments.
///
/// An unterminated block comment is left in place; the statements it turns
/// into fall through the walk as unrecognized and are dropped there.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("/*") {
        match rest[start + 2..].find("*/") {
            Some(end) => {
                out.push_str(&rest[..start]);
                out.push(' ');
                rest = &rest[start + 2 + end + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);

    out.lines()
        .map(|line| match line.find("//") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the node name from an opener statement (trailing `{` included).
///
/// Handles both `name {` and `label: name {`; the label names the node only
/// when the name itself is absent. Returns `None` for openers this grammar
/// does not recognize (e.g. `&ref {` overrides).
fn node_open(stmt: &str) -> Option<&str> {
    let body = stmt.strip_suffix('{')?;
    all_consuming(delimited(
        multispace0,
        alt((labeled_name, node_name_str)),
        multispace0,
    ))(body)
    .finish()
    .ok()
    .map(|(_, name)| name)
}

/// Split a `key = value;` statement. The value is stored verbatim (trimmed),
/// quotes and cell groups untouched.
fn property(stmt: &str) -> Option<(&str, &str)> {
    let body = stmt.strip_suffix(';')?;
    let (rest, name) = preceded(multispace0, prop_name_str)(body).finish().ok()?;
    let (value, _) = delimited::<_, _, _, _, nom::error::Error<&str>, _, _, _>(
        multispace0,
        char('='),
        multispace0,
    )(rest)
        .finish()
        .ok()?;
    Some((name, value.trim()))
}

/// Parse a `label: name` (or bare `label:`) opener body.
fn labeled_name(input: &str) -> IResult<&str, &str> {
    map(
        separated_pair(
            node_name_str,
            delimited(multispace0, char(':'), multispace0),
            opt(node_name_str),
        ),
        |(label, name)| name.unwrap_or(label),
    )(input)
}

/// Recognize a node name, unit-address suffix included.
fn node_name_str(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_' | '@' | '-'))(
        input,
    )
}

/// Recognize a property name.
fn prop_name_str(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| {
        c.is_ascii_alphanumeric() || matches!(c, ',' | '.' | '_' | '+' | '@' | '/' | '#' | '-')
    })(input)
}
