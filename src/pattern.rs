//! Regex construction for delimiter-bounded tokens.
//!
//! Delimiters are arbitrary strings, so a token body cannot be matched with a
//! single negated character class once the closing delimiter is longer than
//! one character. Instead the body is a repetition of alternatives, one per
//! position `i` of the closing delimiter: the first `i` closing characters
//! followed by any character that is not the `i`-th one. Such a body may hold
//! any proper prefix of the closing delimiter (a lone `}` inside `{{ }}`) but
//! never the closing delimiter itself.

use crate::delimiters::DelimiterPair;
use crate::error::Result;
use regex::Regex;

/// Group name holding the token body in [`token_regex`]
pub const TOKEN_GROUP: &str = "name";

/// Builds the body pattern that can never contain `close`.
///
/// For `close = "}#"` this yields `(?:[^\}]|\}[^\#])*`.
pub fn content_pattern(close: &str) -> String {
    let characters: Vec<char> = close.chars().collect();
    let mut alternatives = Vec::with_capacity(characters.len());

    for (i, current) in characters.iter().enumerate() {
        let prefix: String = characters[..i]
            .iter()
            .map(|c| regex::escape(&c.to_string()))
            .collect();
        alternatives.push(format!(
            "{prefix}[^{}]",
            regex::escape(&current.to_string())
        ));
    }

    format!("(?:{})*", alternatives.join("|"))
}

/// Pattern for an inline token: `open`, a named body, `close`.
pub fn wrapper_pattern(pair: &DelimiterPair, group: &str) -> String {
    format!(
        "{}(?P<{group}>{}){}",
        regex::escape(&pair.open),
        content_pattern(&pair.close),
        regex::escape(&pair.close),
    )
}

/// Line-oriented variant for block markers: `open` and `close` each end or
/// start their own line. Whitespace and blank lines before either marker are
/// tolerated, the body excludes the line breaks around it. The body is lazy so
/// trailing blank lines and a `\r` before the final line break stay outside it.
pub fn block_wrapper_pattern(pair: &DelimiterPair, group: &str) -> String {
    format!(
        r"\s*{}\r?\n(?P<{group}>{}?)\r?\n\s*{}",
        regex::escape(&pair.open),
        content_pattern(&pair.close),
        regex::escape(&pair.close),
    )
}

/// Compiles the inline token regex for `pair`, body captured as [`TOKEN_GROUP`].
///
/// # Errors
///
/// Returns `WeftError::Regex` if the generated pattern does not compile.
pub fn token_regex(pair: &DelimiterPair) -> Result<Regex> {
    Ok(Regex::new(&wrapper_pattern(pair, TOKEN_GROUP))?)
}
