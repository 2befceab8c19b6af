use crate::delimiters::DelimiterPair;
use crate::error::{Result, WeftError};
use crate::pattern::{TOKEN_GROUP, token_regex};
use crate::value::Map;

/// Substitutes every `<open>name<close>` token of `structure` whose name is in
/// `variables` with the value's text.
///
/// Entries are applied one after another in name order, so a value whose text
/// itself looks like a token of a later entry gets substituted too.
///
/// # Errors
///
/// In `strict` mode, returns `WeftError::MissingVariable` naming the first
/// token still present after all substitutions. Returns `WeftError::Regex` if
/// the token pattern cannot be compiled.
pub fn interpolate(
    structure: &str,
    variables: &Map,
    delimiters: &DelimiterPair,
    strict: bool,
) -> Result<String> {
    let mut rendered = structure.to_string();

    for (name, value) in variables {
        let token = delimiters.wrap(name);
        if rendered.contains(&token) {
            rendered = rendered.replace(&token, &value.to_string());
        }
    }

    if strict {
        let tokens = token_regex(delimiters)?;
        if let Some(captures) = tokens.captures(&rendered) {
            let name = captures
                .name(TOKEN_GROUP)
                .map_or("", |m| m.as_str())
                .to_string();
            return Err(WeftError::MissingVariable { name });
        }
    }

    Ok(rendered)
}
