use crate::error::{Result, WeftError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEFT_DELIMITER: &str = "{{";
pub const DEFAULT_RIGHT_DELIMITER: &str = "}}";
pub const DEFAULT_LEFT_LOOP_VARIABLE_DELIMITER: &str = "(";
pub const DEFAULT_RIGHT_LOOP_VARIABLE_DELIMITER: &str = ")";
pub const DEFAULT_LEFT_LOOP_BLOCK_DELIMITER: &str = "[";
pub const DEFAULT_RIGHT_LOOP_BLOCK_DELIMITER: &str = "]";

/// Opening and closing marker around a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterPair {
    pub open: String,
    pub close: String,
}

impl DelimiterPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Wraps `name` in this pair, e.g. `name` -> `{{name}}`
    pub fn wrap(&self, name: &str) -> String {
        format!("{}{name}{}", self.open, self.close)
    }

    fn validate(&self, role: &'static str) -> Result<()> {
        for (side, delimiter) in [("open", &self.open), ("close", &self.close)] {
            if delimiter.is_empty() {
                return Err(WeftError::MalformedDelimiterConfig {
                    role,
                    message: format!("{side} delimiter is empty"),
                });
            }
            if delimiter.contains(['\n', '\r']) {
                return Err(WeftError::MalformedDelimiterConfig {
                    role,
                    message: format!("{side} delimiter {delimiter:?} contains a line break"),
                });
            }
        }
        Ok(())
    }
}

/// The three delimiter pairs a template is written with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    /// Variable tokens, `{{name}}` by default
    pub variable: DelimiterPair,
    /// Loop name and joiner tokens, `(items)` by default
    pub loop_variable: DelimiterPair,
    /// Loop body markers, `[` ... `]` by default
    pub loop_block: DelimiterPair,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            variable: DelimiterPair::new(DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER),
            loop_variable: DelimiterPair::new(
                DEFAULT_LEFT_LOOP_VARIABLE_DELIMITER,
                DEFAULT_RIGHT_LOOP_VARIABLE_DELIMITER,
            ),
            loop_block: DelimiterPair::new(
                DEFAULT_LEFT_LOOP_BLOCK_DELIMITER,
                DEFAULT_RIGHT_LOOP_BLOCK_DELIMITER,
            ),
        }
    }
}

impl Delimiters {
    /// Builds the configuration from six caller strings. Empty strings fall
    /// back to their defaults.
    pub fn new(
        left: &str,
        right: &str,
        left_loop_variable: &str,
        right_loop_variable: &str,
        left_loop_block: &str,
        right_loop_block: &str,
    ) -> Self {
        Self {
            variable: DelimiterPair::new(
                or_default(left, DEFAULT_LEFT_DELIMITER),
                or_default(right, DEFAULT_RIGHT_DELIMITER),
            ),
            loop_variable: DelimiterPair::new(
                or_default(left_loop_variable, DEFAULT_LEFT_LOOP_VARIABLE_DELIMITER),
                or_default(right_loop_variable, DEFAULT_RIGHT_LOOP_VARIABLE_DELIMITER),
            ),
            loop_block: DelimiterPair::new(
                or_default(left_loop_block, DEFAULT_LEFT_LOOP_BLOCK_DELIMITER),
                or_default(right_loop_block, DEFAULT_RIGHT_LOOP_BLOCK_DELIMITER),
            ),
        }
    }

    /// Checks that every pair can be turned into a token pattern.
    ///
    /// # Errors
    ///
    /// Returns `WeftError::MalformedDelimiterConfig` when a delimiter is empty or
    /// spans a line break, or when the loop-variable and loop-block pairs are
    /// identical (the loop grammar could not tell a joiner from a body).
    pub fn validate(&self) -> Result<()> {
        self.variable.validate("variable")?;
        self.loop_variable.validate("loop variable")?;
        self.loop_block.validate("loop block")?;

        if self.loop_variable == self.loop_block {
            return Err(WeftError::MalformedDelimiterConfig {
                role: "loop block",
                message: "must differ from the loop variable delimiters".to_string(),
            });
        }

        Ok(())
    }
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
