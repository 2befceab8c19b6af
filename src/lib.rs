//! # weft
//!
//! A text template renderer with configurable, multi-character delimiters.
//! Templates contain variable tokens and array-bound loop blocks:
//!
//! ```text
//! # {{title}}
//!   (items)(,)[
//!     - {{name}}: {{qty}}
//!   ]
//! ```
//!
//! Each loop block is expanded once per element of the named array, each copy
//! reindented to the loop tag's column and joined by the optional joiner. Then
//! every variable token is replaced with its value.
//!
//! ## Features
//!
//! - Any delimiter pair for variables (`{{ }}`), loop names (`( )`) and loop
//!   blocks (`[ ]`), including multi-character ones such as `#{` / `}#`
//! - Loop expansion preserving relative indentation
//! - Strict mode failing on unresolved tokens
//! - JSON, CSV and xlsx variable sources, JSONPath filtering, single or
//!   multiple output
//! - CLI for files and directories, HTTP server for named templates
//!
//! ## Usage
//!
//! ### As a Library
//!
//! ```
//! use weft::{Map, RenderOptions};
//!
//! let variables: Map = serde_json::from_str(
//!     r#"{"items": [{"name": "a"}, {"name": "b"}]}"#,
//! ).unwrap();
//!
//! let rendered = weft::render("(items)[\n  - {{name}}\n]", &variables, &RenderOptions::strict());
//! assert_eq!(rendered.unwrap(), "- a\n- b");
//! ```
//!
//! ### As a CLI Tool
//!
//! ```bash
//! # Render one template
//! weft render --in page.tpl --out page.txt --data data.json
//!
//! # Render a directory, one output tree per array element
//! weft render --mode dir --in templates/ --out build/ --data rows.csv --multiple-output
//!
//! # Serve templates over HTTP
//! weft serve --port 8080 --template-dir templates/
//! ```
//!
//! Loops do not nest: a loop body is plain text with variable tokens.

pub mod delimiters;
pub mod error;
pub mod flatten;
pub mod fs_utils;
pub mod interpolate;
pub mod loops;
pub mod pattern;
pub mod render;
pub mod server;
pub mod template;
pub mod value;
pub mod variables;

// Re-export main types and functions for convenience
pub use delimiters::{DelimiterPair, Delimiters};
pub use error::{Result, WeftError};
pub use flatten::ReindentPolicy;
pub use loops::{Loop, extract_loops};
pub use render::{RenderOptions, render, render_with_delimiters};
pub use template::{RenderedOutput, TemplateConfig, render_directory, render_template};
pub use value::{Map, Value};
pub use variables::{LoadOptions, VariablesFormat, load_variables, load_variables_file};
