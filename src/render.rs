use crate::delimiters::Delimiters;
use crate::error::Result;
use crate::flatten::{ReindentPolicy, flatten_structure, flatten_variables};
use crate::interpolate::interpolate;
use crate::loops::extract_loops;
use crate::value::Map;

/// Configuration for a render call
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Delimiter pairs the template is written with
    pub delimiters: Delimiters,
    /// Fail on tokens left unresolved instead of keeping them verbatim
    pub strict: bool,
    /// Handling of loop bodies indented left of their loop tag
    pub reindent: ReindentPolicy,
}

impl RenderOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Renders `template` against `variables`: expands loops, then substitutes
/// variable tokens.
///
/// # Errors
///
/// - `WeftError::MalformedDelimiterConfig` if the delimiters are unusable.
/// - `WeftError::MissingVariable` in strict mode when a token stays unresolved.
/// - `WeftError::ReindentUnderflow` under [`ReindentPolicy::Fail`].
pub fn render(template: &str, variables: &Map, options: &RenderOptions) -> Result<String> {
    let delimiters = &options.delimiters;
    delimiters.validate()?;

    let loops = extract_loops(
        template,
        variables,
        &delimiters.loop_variable,
        &delimiters.loop_block,
    )?;
    tracing::debug!(loops = loops.len(), "flattening template");

    let structure = flatten_structure(template, &loops, &delimiters.variable, options.reindent)?;
    let flat = flatten_variables(variables, &loops);

    interpolate(&structure, &flat, &delimiters.variable, options.strict)
}

/// [`render`] taking the six delimiter strings directly. Empty strings select
/// the default for their role.
///
/// # Errors
///
/// Same as [`render`].
#[allow(clippy::too_many_arguments)]
pub fn render_with_delimiters(
    template: &str,
    variables: &Map,
    left: &str,
    right: &str,
    left_loop_variable: &str,
    right_loop_variable: &str,
    left_loop_block: &str,
    right_loop_block: &str,
    strict: bool,
) -> Result<String> {
    let options = RenderOptions {
        delimiters: Delimiters::new(
            left,
            right,
            left_loop_variable,
            right_loop_variable,
            left_loop_block,
            right_loop_block,
        ),
        strict,
        reindent: ReindentPolicy::default(),
    };
    render(template, variables, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WeftError;
    use crate::value::Value;
    use serde_json::json;

    fn env(value: serde_json::Value) -> Map {
        match Value::from(value) {
            Value::Map(map) => map,
            _ => panic!("test environment must be an object"),
        }
    }

    #[test]
    fn test_render_plain_substitution() {
        let variables = env(json!({"who": "world"}));
        let result = render("hello {{who}}!", &variables, &RenderOptions::strict()).unwrap();
        assert_eq!(result, "hello world!");
    }

    #[test]
    fn test_render_loop_and_scalars() {
        let template = "# {{title}}\n(items)[\n  - {{name}} ({{qty}})\n]\nend";
        let variables = env(json!({
            "title": "List",
            "items": [{"name": "a", "qty": 1}, {"name": "b", "qty": 2}]
        }));
        let result = render(template, &variables, &RenderOptions::strict()).unwrap();
        assert_eq!(result, "# List\n- a (1)\n- b (2)\nend");
    }

    #[test]
    fn test_render_with_delimiters_defaults_empty_strings() {
        let variables = env(json!({"x": 1, "rows": [{"v": "p"}, {"v": "q"}]}));
        let template = "{{x}}\n(rows)[\n{{v}}\n]";
        let result =
            render_with_delimiters(template, &variables, "", "", "", "", "", "", true).unwrap();
        assert_eq!(result, "1\np\nq");
    }

    #[test]
    fn test_render_rejects_malformed_delimiters() {
        let result = render_with_delimiters("", &Map::new(), "", "", "<", ">", "<", ">", false);
        assert!(matches!(
            result,
            Err(WeftError::MalformedDelimiterConfig { .. })
        ));
    }

    #[test]
    fn test_render_unbound_loop_is_empty_even_when_strict() {
        let template = "a\n(nothing)[\n  {{name}}\n]\nb";
        let result = render(template, &Map::new(), &RenderOptions::strict()).unwrap();
        assert_eq!(result, "a\n\nb");
    }
}
