use crate::error::{Result, WeftError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Reads the contents of a file at the given path
///
/// # Errors
///
/// - `WeftError::TemplateNotFound` if the path doesn't exist or isn't a file.
/// - `WeftError::Io` if there's an error reading the file.
pub fn read_file_contents(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(WeftError::TemplateNotFound {
            name: path.display().to_string(),
        });
    }

    fs::read_to_string(path).map_err(std::convert::Into::into)
}

/// Writes `content` to `path`, creating missing parent directories
///
/// # Errors
///
/// Returns `WeftError::Io` if a directory or the file cannot be written.
pub fn write_file_contents(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Resolves a template name inside `base_dir`.
/// Ensures the path doesn't escape the template directory
///
/// # Errors
///
/// - `WeftError::PathTraversal` if the resolved path escapes the base directory.
/// - `WeftError::Io` if there's an error canonicalizing paths.
pub fn resolve_template_path(name: &str, base_dir: &Path) -> Result<PathBuf> {
    // Remove leading slashes so the name is always relative
    let cleaned = name.trim_start_matches('/').trim_start_matches('\\');
    let full_path = base_dir.join(cleaned);

    // Canonicalize to resolve .. and . components
    let canonical = full_path.canonicalize().or_else(|_| {
        // If the file doesn't exist yet, canonicalize the parent and append the filename
        full_path.parent().map_or_else(
            || {
                Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "Invalid path",
                ))
            },
            |parent| {
                parent
                    .canonicalize()
                    .map(|p| p.join(full_path.file_name().unwrap_or_default()))
            },
        )
    })?;

    let base_canonical = base_dir.canonicalize()?;
    if canonical == base_canonical || !canonical.starts_with(&base_canonical) {
        return Err(WeftError::PathTraversal { path: canonical });
    }

    Ok(canonical)
}

/// Compiles exclude patterns into one matcher; `None` when there are none
///
/// # Errors
///
/// Returns `WeftError::Glob` for an invalid pattern.
pub fn build_exclude_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

/// Lists every file below `root` as a path relative to `root`, sorted.
/// Files matching `exclude` (relative path) are skipped.
///
/// # Errors
///
/// Returns `WeftError::WalkDir` if the directory cannot be traversed.
pub fn collect_templates(root: &Path, exclude: Option<&GlobSet>) -> Result<Vec<PathBuf>> {
    let mut templates = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();

        if let Some(set) = exclude
            && set.is_match(&relative)
        {
            tracing::debug!(path = %relative.display(), "excluded");
            continue;
        }

        templates.push(relative);
    }

    Ok(templates)
}
