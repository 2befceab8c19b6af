use crate::delimiters::DelimiterPair;
use crate::error::Result;
use crate::pattern::{block_wrapper_pattern, wrapper_pattern};
use crate::value::{Map, Value};
use regex::Regex;

/// Separator placed between iterations when the loop tag names none
pub const DEFAULT_JOINER: &str = "\n";

/// A loop construct found in a template, bound to its array data
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    /// Byte offset where the construct starts (beginning of its line)
    pub start: usize,
    /// Byte offset one past the closing block delimiter
    pub end: usize,
    /// Name of the array variable the loop iterates over
    pub variable: String,
    /// Scalar entries of each array element, in array order
    pub values: Vec<Map>,
    /// Body text between the block delimiters
    pub block: String,
    /// Leading whitespace before the loop tag, in characters
    pub offset: usize,
    /// Text placed between iterations
    pub joiner: String,
}

/// Finds every loop construct in `template`, in source order.
///
/// A loop reads `(items)[` ... `]` with the default delimiters, optionally
/// with a joiner tag after the name: `(items)(, )[` ... `]`. The tag starts its
/// line and the block markers sit on their own lines. Loops do not nest.
///
/// # Errors
///
/// Returns `WeftError::Regex` if the loop pattern cannot be compiled.
pub fn extract_loops(
    template: &str,
    variables: &Map,
    loop_variable: &DelimiterPair,
    loop_block: &DelimiterPair,
) -> Result<Vec<Loop>> {
    let pattern = format!(
        r"(?m)(?P<offset>^[ \t]*){}(?:{})?{}",
        wrapper_pattern(loop_variable, "variable"),
        wrapper_pattern(loop_variable, "joiner"),
        block_wrapper_pattern(loop_block, "block"),
    );
    let loop_regex = Regex::new(&pattern)?;

    let mut loops = Vec::new();
    for captures in loop_regex.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let variable = captures
            .name("variable")
            .map_or("", |m| m.as_str())
            .to_string();

        let mut extracted = Loop {
            start: whole.start(),
            end: whole.end(),
            values: bind_values(variables, &variable),
            variable,
            block: captures
                .name("block")
                .map_or("", |m| m.as_str())
                .to_string(),
            offset: captures
                .name("offset")
                .map_or(0, |m| m.as_str().chars().count()),
            joiner: DEFAULT_JOINER.to_string(),
        };
        if let Some(joiner) = captures.name("joiner") {
            extracted.joiner = joiner.as_str().to_string();
        }

        tracing::trace!(
            variable = %extracted.variable,
            start = extracted.start,
            end = extracted.end,
            offset = extracted.offset,
            iterations = extracted.values.len(),
            "extracted loop"
        );
        loops.push(extracted);
    }

    Ok(loops)
}

/// Copies the scalar entries of each element of the array named `name`.
///
/// Anything other than an array of mappings binds to no iterations, so the
/// loop renders as empty text.
fn bind_values(variables: &Map, name: &str) -> Vec<Map> {
    let Some(items) = variables.get(name).and_then(Value::as_list) else {
        tracing::debug!(variable = name, "loop variable is not an array, rendering empty");
        return Vec::new();
    };

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let Some(entries) = item.as_map() else {
            tracing::debug!(
                variable = name,
                "loop variable holds a non-mapping element, rendering empty"
            );
            return Vec::new();
        };
        values.push(
            entries
                .iter()
                .filter(|(_, v)| v.is_scalar())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(value: serde_json::Value) -> Map {
        match Value::from(value) {
            Value::Map(map) => map,
            _ => panic!("test environment must be an object"),
        }
    }

    fn default_pairs() -> (DelimiterPair, DelimiterPair) {
        (DelimiterPair::new("(", ")"), DelimiterPair::new("[", "]"))
    }

    #[test]
    fn test_extract_single_loop() {
        let (var, block) = default_pairs();
        let template = "head\n(items)[\n  {{name}}\n]\ntail";
        let variables = env(json!({"items": [{"name": "a"}, {"name": "b"}]}));

        let loops = extract_loops(template, &variables, &var, &block).unwrap();
        assert_eq!(loops.len(), 1);

        let extracted = &loops[0];
        assert_eq!(extracted.variable, "items");
        assert_eq!(extracted.block, "  {{name}}");
        assert_eq!(extracted.offset, 0);
        assert_eq!(extracted.joiner, "\n");
        assert_eq!(&template[extracted.start..extracted.end], "(items)[\n  {{name}}\n]");
        assert_eq!(extracted.values.len(), 2);
        assert_eq!(extracted.values[1]["name"], Value::from("b"));
    }

    #[test]
    fn test_extract_offset_and_joiner() {
        let (var, block) = default_pairs();
        let template = "list:\n  (items)(,)[\n    {{name}}\n  ]\n";
        let variables = env(json!({"items": [{"name": "a"}]}));

        let loops = extract_loops(template, &variables, &var, &block).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].offset, 2);
        assert_eq!(loops[0].joiner, ",");
        assert_eq!(loops[0].block, "    {{name}}");
        assert!(template[loops[0].start..].starts_with("  (items)"));
    }

    #[test]
    fn test_offset_ignores_preceding_blank_lines() {
        let (var, block) = default_pairs();
        let template = "a\n\n\n  (items)[\n  x\n  ]";
        let loops = extract_loops(template, &Map::new(), &var, &block).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].offset, 2);
    }

    #[test]
    fn test_extract_multiple_loops_in_order() {
        let (var, block) = default_pairs();
        let template = "(a)[\n{{x}}\n]\nmiddle\n(b)[\n{{y}}\n]";
        let loops = extract_loops(template, &Map::new(), &var, &block).unwrap();
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].variable, "a");
        assert_eq!(loops[1].variable, "b");
        assert!(loops[0].end <= loops[1].start);
    }

    #[test]
    fn test_unbound_variable_yields_no_values() {
        let (var, block) = default_pairs();
        let template = "(missing)[\n{{x}}\n]";
        let variables = env(json!({"scalar": "text", "numbers": [1, 2]}));

        let loops = extract_loops(template, &variables, &var, &block).unwrap();
        assert_eq!(loops.len(), 1);
        assert!(loops[0].values.is_empty());

        let loops = extract_loops("(scalar)[\n{{x}}\n]", &variables, &var, &block).unwrap();
        assert!(loops[0].values.is_empty());

        let loops = extract_loops("(numbers)[\n{{x}}\n]", &variables, &var, &block).unwrap();
        assert!(loops[0].values.is_empty());
    }

    #[test]
    fn test_values_keep_only_scalars() {
        let (var, block) = default_pairs();
        let variables = env(json!({
            "items": [{"name": "a", "n": 1, "nested": {"x": 1}, "list": [1]}]
        }));
        let loops = extract_loops("(items)[\n{{name}}\n]", &variables, &var, &block).unwrap();
        let value = &loops[0].values[0];
        assert_eq!(value.len(), 2);
        assert!(value.contains_key("name"));
        assert!(value.contains_key("n"));
    }

    #[test]
    fn test_custom_multi_character_delimiters() {
        let var = DelimiterPair::new("<<", ">>");
        let block = DelimiterPair::new("[[", "]]");
        let template = "<<rows>><<; >>[[\n  a[0] = {{v}}\n]]";
        let variables = env(json!({"rows": [{"v": 1}, {"v": 2}]}));

        let loops = extract_loops(template, &variables, &var, &block).unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].joiner, "; ");
        assert_eq!(loops[0].block, "  a[0] = {{v}}");
        assert_eq!(loops[0].values.len(), 2);
    }

    #[test]
    fn test_inline_parentheses_are_not_loops() {
        let (var, block) = default_pairs();
        let template = "call(arg) and [list]\n(x)[inline]";
        let loops = extract_loops(template, &Map::new(), &var, &block).unwrap();
        assert!(loops.is_empty());
    }
}
