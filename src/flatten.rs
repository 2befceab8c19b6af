//! Loop expansion.
//!
//! Every iteration of a loop gets its own copy of the loop body in which each
//! key token is renamed to a synthetic name unique to (loop, key, iteration).
//! [`flatten_variables`] builds the matching flat map, so after both passes a
//! template is plain text with plain tokens and plain scalar values.

use crate::delimiters::DelimiterPair;
use crate::error::{Result, WeftError};
use crate::loops::Loop;
use crate::value::{Map, Value};
use serde::{Deserialize, Serialize};

/// What to do with a loop body indented less than its loop tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReindentPolicy {
    /// Leave the body's indentation untouched
    #[default]
    Preserve,
    /// Shift every line right with spaces until the first line matches the tag
    Pad,
    /// Refuse to render
    Fail,
}

/// Name under which iteration `index` of `variable` exposes `key`.
///
/// Both the structure and the variable flattening go through this function.
pub fn synthetic_name(variable: &str, key: &str, index: usize) -> String {
    format!("{variable}_{key}_{index}")
}

/// Rewrites each token `<open>from<close>` of `mapping` into `<open>to<close>`.
pub fn rename_variables(
    structure: &str,
    mapping: &[(String, String)],
    delimiters: &DelimiterPair,
) -> String {
    let mut rendered = structure.to_string();
    for (from, to) in mapping {
        rendered = rendered.replace(&delimiters.wrap(from), &delimiters.wrap(to));
    }
    rendered
}

fn is_indent(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

/// Number of whitespace characters opening the first line of `s`
pub fn count_leading_whitespace(s: &str) -> usize {
    s.chars().take_while(|c| is_indent(*c)).count()
}

fn is_blank(line: &str) -> bool {
    line.chars().all(char::is_whitespace)
}

/// Indentation of the first non-blank line of `content`, if it has one
fn content_indent(content: &str) -> Option<usize> {
    content
        .split('\n')
        .find(|line| !is_blank(line))
        .map(count_leading_whitespace)
}

/// Aligns the first non-blank line of `content` to `base_offset` columns,
/// shifting every other non-blank line by the same amount. Blank lines are
/// kept as they are.
///
/// # Errors
///
/// Returns `WeftError::ReindentUnderflow` when the content sits left of
/// `base_offset` and `policy` is [`ReindentPolicy::Fail`].
pub fn reindent(
    content: &str,
    base_offset: usize,
    policy: ReindentPolicy,
    variable: &str,
) -> Result<String> {
    let Some(indent) = content_indent(content) else {
        return Ok(content.to_string());
    };

    if indent > base_offset {
        let delta = indent - base_offset;
        let lines: Vec<&str> = content
            .split('\n')
            .map(|line| {
                if is_blank(line) {
                    return line;
                }
                let skip: usize = line
                    .chars()
                    .take(delta)
                    .take_while(|c| is_indent(*c))
                    .map(char::len_utf8)
                    .sum();
                &line[skip..]
            })
            .collect();
        return Ok(lines.join("\n"));
    }

    if indent < base_offset {
        match policy {
            ReindentPolicy::Preserve => {
                tracing::debug!(
                    variable,
                    indent,
                    offset = base_offset,
                    "loop body indented left of its tag, keeping as is"
                );
            }
            ReindentPolicy::Pad => {
                let padding = " ".repeat(base_offset - indent);
                let lines: Vec<String> = content
                    .split('\n')
                    .map(|line| {
                        if is_blank(line) {
                            line.to_string()
                        } else {
                            format!("{padding}{line}")
                        }
                    })
                    .collect();
                return Ok(lines.join("\n"));
            }
            ReindentPolicy::Fail => {
                return Err(WeftError::ReindentUnderflow {
                    variable: variable.to_string(),
                    offset: base_offset,
                    indent,
                });
            }
        }
    }

    Ok(content.to_string())
}

/// Rename pairs for one iteration. Keys may be written bare (`{{name}}`) or
/// qualified by the loop variable (`{{items_name}}`). Bare keys are renamed
/// first, and a qualified form that is itself a key of the element stays a
/// bare key.
fn iteration_mapping(looped: &Loop, value: &Map, index: usize) -> Vec<(String, String)> {
    let mut mapping: Vec<(String, String)> = value
        .keys()
        .map(|key| (key.clone(), synthetic_name(&looped.variable, key, index)))
        .collect();

    for key in value.keys() {
        let qualified = format!("{}_{key}", looped.variable);
        if !value.contains_key(&qualified) {
            mapping.push((qualified, synthetic_name(&looped.variable, key, index)));
        }
    }
    mapping
}

/// Line ending of a loop span: `\r\n` when its lines end that way, `\n` otherwise
fn line_ending(span: &str) -> &'static str {
    if span.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Text placed between two iterations: the joiner followed by one line ending.
/// A joiner that already ends with a line break gets no second one.
fn separator(joiner: &str, eol: &str) -> String {
    let joiner = joiner
        .strip_suffix('\n')
        .map(|j| j.strip_suffix('\r').unwrap_or(j))
        .unwrap_or(joiner);
    format!("{joiner}{eol}")
}

fn expand_loop(
    looped: &Loop,
    eol: &str,
    delimiters: &DelimiterPair,
    policy: ReindentPolicy,
) -> Result<String> {
    let mut iterations = Vec::with_capacity(looped.values.len());

    for (index, value) in looped.values.iter().enumerate() {
        let mapping = iteration_mapping(looped, value, index);
        let renamed = rename_variables(&looped.block, &mapping, delimiters);
        let indented = reindent(&renamed, looped.offset, policy, &looped.variable)?;
        iterations.push(indented.trim_end().to_string());
    }

    Ok(iterations
        .join(&separator(&looped.joiner, eol))
        .trim_end()
        .to_string())
}

/// Replaces every loop span of `structure` with its expanded iterations.
///
/// Iterations are joined with the line ending of their loop span, so CRLF
/// templates stay CRLF.
///
/// `loops` must be sorted by position and must not overlap, as produced by
/// [`crate::loops::extract_loops`].
///
/// # Errors
///
/// Propagates `WeftError::ReindentUnderflow` from [`reindent`].
pub fn flatten_structure(
    structure: &str,
    loops: &[Loop],
    delimiters: &DelimiterPair,
    policy: ReindentPolicy,
) -> Result<String> {
    let mut rendered = String::with_capacity(structure.len());
    let mut cursor = 0;

    for looped in loops {
        debug_assert!(looped.start >= cursor, "loops must be ordered and disjoint");
        rendered.push_str(&structure[cursor..looped.start]);
        let eol = line_ending(&structure[looped.start..looped.end]);
        rendered.push_str(&expand_loop(looped, eol, delimiters, policy)?);
        // jump past the closing block delimiter
        cursor = looped.end;
    }
    rendered.push_str(&structure[cursor..]);

    Ok(rendered)
}

/// Builds the flat variable map matching [`flatten_structure`]'s renaming.
///
/// Top-level scalars and arrays of `variables` are laid over the synthetic
/// names and win on collision.
pub fn flatten_variables(variables: &Map, loops: &[Loop]) -> Map {
    let mut flat = Map::new();

    for looped in loops {
        for (index, value) in looped.values.iter().enumerate() {
            for (key, v) in value {
                flat.insert(synthetic_name(&looped.variable, key, index), v.clone());
            }
        }
    }

    for (key, value) in variables {
        if !matches!(value, Value::Map(_)) {
            flat.insert(key.clone(), value.clone());
        }
    }

    flat
}
