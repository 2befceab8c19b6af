use crate::delimiters::DelimiterPair;
use crate::error::Result;
use crate::fs_utils::{collect_templates, read_file_contents, write_file_contents};
use crate::interpolate::interpolate;
use crate::render::{RenderOptions, render};
use crate::value::{Map, Value};
use globset::GlobSet;
use std::path::{Path, PathBuf};

/// Output name used for each variable set when none is configured
pub const DEFAULT_FILENAME_PATTERN: &str = "{i}";

/// Variable holding the 0-based variable set index in filename patterns
pub const INDEX_VARIABLE: &str = "i";

/// Configuration for rendering template files to output files
#[derive(Debug, Clone)]
pub struct TemplateConfig {
    /// Delimiters, strictness and reindent policy
    pub render: RenderOptions,
    /// Write one output per variable set instead of a single output
    pub multiple_output: bool,
    /// Output name for each variable set, `{name}` tokens and `{i}` resolved
    pub filename_pattern: String,
    /// Template files to skip when rendering a directory
    pub exclude: Option<GlobSet>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            multiple_output: false,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            exclude: None,
        }
    }
}

/// A rendered template and where it belongs
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub path: PathBuf,
    pub content: String,
}

/// Resolves the filename pattern for variable set `index`.
///
/// The pattern uses single braces: `report-{name}-{i}`. Only scalar variables
/// are available; unknown names are kept verbatim.
///
/// # Errors
///
/// Returns `WeftError::Regex` if the token pattern cannot be compiled.
pub fn output_name(pattern: &str, variables: &Map, index: usize) -> Result<String> {
    let mut names: Map = variables
        .iter()
        .filter(|(_, v)| v.is_scalar())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    names.insert(INDEX_VARIABLE.to_string(), Value::from(index));

    interpolate(pattern, &names, &DelimiterPair::new("{", "}"), false)
}

fn with_extension_of(name: String, input: &Path) -> String {
    match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{name}.{ext}"),
        None => name,
    }
}

/// Renders one template for every variable set.
///
/// Single output renders the first set to `output`. Multiple output renders
/// each set to `output/<pattern>` carrying the input file's extension.
///
/// # Errors
///
/// Returns the errors of [`render`] and [`output_name`].
pub fn render_template(
    template: &str,
    input: &Path,
    output: &Path,
    sets: &[Map],
    config: &TemplateConfig,
) -> Result<Vec<RenderedOutput>> {
    if !config.multiple_output {
        let empty = Map::new();
        let variables = sets.first().unwrap_or(&empty);
        return Ok(vec![RenderedOutput {
            path: output.to_path_buf(),
            content: render(template, variables, &config.render)?,
        }]);
    }

    let mut outputs = Vec::with_capacity(sets.len());
    for (index, variables) in sets.iter().enumerate() {
        let name = output_name(&config.filename_pattern, variables, index)?;
        outputs.push(RenderedOutput {
            path: output.join(with_extension_of(name, input)),
            content: render(template, variables, &config.render)?,
        });
    }
    Ok(outputs)
}

/// Renders every file under `input_dir`, mirroring its relative path below
/// `output_dir` (below `output_dir/<pattern>` for multiple output).
///
/// # Errors
///
/// Returns directory traversal and read errors as well as those of
/// [`render_template`].
pub fn render_directory(
    input_dir: &Path,
    output_dir: &Path,
    sets: &[Map],
    config: &TemplateConfig,
) -> Result<Vec<RenderedOutput>> {
    let mut outputs = Vec::new();

    for relative in collect_templates(input_dir, config.exclude.as_ref())? {
        tracing::info!(template = %relative.display(), "rendering");
        let template = read_file_contents(&input_dir.join(&relative))?;

        if config.multiple_output {
            for (index, variables) in sets.iter().enumerate() {
                let name = output_name(&config.filename_pattern, variables, index)?;
                outputs.push(RenderedOutput {
                    path: output_dir.join(name).join(&relative),
                    content: render(&template, variables, &config.render)?,
                });
            }
        } else {
            outputs.extend(render_template(
                &template,
                &relative,
                &output_dir.join(&relative),
                sets,
                config,
            )?);
        }
    }

    Ok(outputs)
}

/// Writes every output, creating directories as needed
///
/// # Errors
///
/// Returns `WeftError::Io` on the first failed write.
pub fn write_outputs(outputs: &[RenderedOutput]) -> Result<()> {
    for output in outputs {
        tracing::info!(path = %output.path.display(), "writing output");
        write_file_contents(&output.path, &output.content)?;
    }
    Ok(())
}
