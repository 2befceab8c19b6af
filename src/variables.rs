//! Variable sources.
//!
//! Turns a JSON document, a `;`-separated CSV sheet or the first sheet of an
//! xlsx workbook into the variable sets a template is rendered with: one set
//! for single output, one set per array element for multiple output.

use crate::error::{Result, WeftError};
use crate::value::{Map, Value};
use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use serde_json_path::JsonPath;
use std::io::Cursor;
use std::path::Path;

/// Column holding variable names in CSV sheets unless configured otherwise
pub const DEFAULT_KEY_COLUMN: &str = "key";

/// Name an array is exposed under when rendering it into a single output
pub const DEFAULT_LOOP_INJECTION_VARIABLE: &str = "root";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encoding of a variable source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablesFormat {
    Json,
    Csv,
    Xlsx,
}

impl VariablesFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns `WeftError::UnsupportedFormat` for anything but `.json`, `.csv`
    /// and `.xlsx`.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(WeftError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// How a variable source is narrowed and split into variable sets
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Sheet column whose cells name the variables
    pub key_column: String,
    /// JSON pointer selecting the part of the document to render with
    pub pointer: Option<String>,
    /// JSONPath query run after the pointer; its matches become the document
    pub filter: Option<String>,
    /// Produce one variable set per array element
    pub multiple_output: bool,
    /// Variable an array is bound to in single-output mode
    pub loop_injection_variable: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            pointer: None,
            filter: None,
            multiple_output: false,
            loop_injection_variable: DEFAULT_LOOP_INJECTION_VARIABLE.to_string(),
        }
    }
}

/// Transposes a sheet: each column other than `key_column` is one record and
/// each row contributes the field named by its key cell. Rows without a key
/// cell are skipped.
fn transpose_sheet<I>(headers: &[String], rows: I, key_column: &str) -> Result<Value>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let key_index = headers
        .iter()
        .position(|h| h == key_column)
        .ok_or_else(|| WeftError::KeyColumnNotFound {
            column: key_column.to_string(),
        })?;

    let mut records = vec![Map::new(); headers.len() - 1];
    for (row_number, row) in rows.into_iter().enumerate() {
        let Some(variable) = row.get(key_index).filter(|k| !k.is_empty()) else {
            tracing::debug!(row = row_number + 1, "skipping sheet row without key");
            continue;
        };

        for (column, cell) in row.iter().enumerate() {
            let record = match column.cmp(&key_index) {
                std::cmp::Ordering::Less => records.get_mut(column),
                std::cmp::Ordering::Equal => continue,
                std::cmp::Ordering::Greater => records.get_mut(column - 1),
            };
            match record {
                Some(record) => {
                    record.insert(variable.clone(), Value::from(cell.as_str()));
                }
                None => {
                    tracing::warn!(
                        row = row_number + 1,
                        column,
                        "ignoring cell beyond the header row"
                    );
                }
            }
        }
    }

    Ok(Value::List(records.into_iter().map(Value::Map).collect()))
}

/// Parses a `;`-separated sheet where each column other than `key_column` is
/// one record and each row contributes the field named by its key cell.
///
/// ```text
/// key;first;second
/// name;a;b          =>  [{"name": "a", "qty": "1"}, {"name": "b", "qty": "2"}]
/// qty;1;2
/// ```
///
/// # Errors
///
/// - `WeftError::KeyColumnNotFound` if the header row lacks `key_column`.
/// - `WeftError::Csv` on malformed input.
pub fn parse_csv(data: &[u8], key_column: &str) -> Result<Value> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .has_headers(true)
        .from_reader(data);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|row| row.map(|row| row.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

    transpose_sheet(&headers, rows, key_column)
}

/// Parses the first sheet of an xlsx workbook laid out like [`parse_csv`]'s
/// input. Cells are taken as their displayed text, and trailing empty cells
/// of a row are dropped.
///
/// # Errors
///
/// - `WeftError::Spreadsheet` if `data` is not a readable workbook.
/// - `WeftError::InvalidVariables` if the workbook has no sheet.
/// - `WeftError::KeyColumnNotFound` if the header row lacks `key_column`.
pub fn parse_xlsx(data: &[u8], key_column: &str) -> Result<Value> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| WeftError::InvalidVariables {
            message: "spreadsheet has no sheet".to_string(),
        })??;

    let mut rows = range.rows().map(|row| {
        let len = row
            .iter()
            .rposition(|cell| !matches!(cell, Data::Empty))
            .map_or(0, |last| last + 1);
        row[..len].iter().map(ToString::to_string).collect::<Vec<String>>()
    });
    let headers = rows.next().unwrap_or_default();

    transpose_sheet(&headers, rows, key_column)
}

/// Parses `data` into a single document.
///
/// # Errors
///
/// Returns `WeftError::Json` or the errors of [`parse_csv`] and [`parse_xlsx`].
pub fn parse_variables(data: &[u8], format: VariablesFormat, key_column: &str) -> Result<Value> {
    match format {
        VariablesFormat::Json => {
            let document: serde_json::Value =
                serde_json::from_slice(data.strip_prefix(UTF8_BOM).unwrap_or(data))?;
            Ok(Value::from(document))
        }
        VariablesFormat::Csv => parse_csv(data, key_column),
        VariablesFormat::Xlsx => parse_xlsx(data, key_column),
    }
}

/// Narrows `document` to the part addressed by a JSON pointer (`/items/0`).
/// An empty pointer addresses the whole document.
///
/// # Errors
///
/// Returns `WeftError::InvalidVariables` if nothing lives at `pointer`.
pub fn select(document: Value, pointer: &str) -> Result<Value> {
    if pointer.is_empty() {
        return Ok(document);
    }

    let document = serde_json::Value::from(document);
    document
        .pointer(pointer)
        .cloned()
        .map(Value::from)
        .ok_or_else(|| WeftError::InvalidVariables {
            message: format!("pointer {pointer:?} does not address any value"),
        })
}

/// Runs the JSONPath `query` over `document` and returns the list of its
/// matches, in document order. A query matching nothing yields an empty list.
///
/// ```text
/// $[?@.sku == 'record1' || @.sku == 'record2']   records with one of two skus
/// $.items[*]                                     every element of "items"
/// ```
///
/// # Errors
///
/// Returns `WeftError::JsonPath` if `query` is not a valid JSONPath expression.
pub fn filter(document: Value, query: &str) -> Result<Value> {
    let path = JsonPath::parse(query)?;
    let document = serde_json::Value::from(document);
    let matches: Vec<Value> = path
        .query(&document)
        .all()
        .into_iter()
        .cloned()
        .map(Value::from)
        .collect();
    tracing::debug!(query, matches = matches.len(), "filtered variables");
    Ok(Value::List(matches))
}

/// Splits a document into the variable sets to render.
///
/// # Errors
///
/// Returns `WeftError::InvalidVariables` when multiple output is requested
/// for anything but an array of objects, or when a single-output document is
/// neither an object nor an array.
pub fn fan_out(document: Value, options: &LoadOptions) -> Result<Vec<Map>> {
    if options.multiple_output {
        let Value::List(items) = document else {
            return Err(WeftError::InvalidVariables {
                message: "multiple output requires list data type".to_string(),
            });
        };
        return items
            .into_iter()
            .map(|item| match item {
                Value::Map(map) => Ok(map),
                _ => Err(WeftError::InvalidVariables {
                    message: "multiple output requires a list of objects".to_string(),
                }),
            })
            .collect();
    }

    match document {
        Value::Map(map) => Ok(vec![map]),
        list @ Value::List(_) => Ok(vec![Map::from([(
            options.loop_injection_variable.clone(),
            list,
        )])]),
        _ => Err(WeftError::InvalidVariables {
            message: "variables must be an object or a list".to_string(),
        }),
    }
}

/// Parses, narrows and splits a variable source.
///
/// # Errors
///
/// Returns the errors of [`parse_variables`], [`select`], [`filter`] and
/// [`fan_out`].
pub fn load_variables(
    data: &[u8],
    format: VariablesFormat,
    options: &LoadOptions,
) -> Result<Vec<Map>> {
    let document = parse_variables(data, format, &options.key_column)?;
    let document = match &options.pointer {
        Some(pointer) => select(document, pointer)?,
        None => document,
    };
    let document = match options.filter.as_deref() {
        Some(query) if !query.is_empty() => filter(document, query)?,
        _ => document,
    };
    let sets = fan_out(document, options)?;
    tracing::debug!(sets = sets.len(), ?format, "loaded variables");
    Ok(sets)
}

/// Reads and loads the variable file at `path`, format chosen by extension.
///
/// # Errors
///
/// Returns `WeftError::UnsupportedFormat`, `WeftError::Io` or the errors of
/// [`load_variables`].
pub fn load_variables_file(path: &Path, options: &LoadOptions) -> Result<Vec<Map>> {
    let format = VariablesFormat::from_path(path)?;
    let data = std::fs::read(path)?;
    load_variables(&data, format, options)
}
