//! `PlantUML` source preprocessing.
//!
//! Runs before hashing and rendering:
//! - resolves `!include` directives against the configured include directories
//! - wraps bare sources in `@startuml`/`@enduml` so the jar accepts them

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::consts::MAX_INCLUDE_DEPTH;

static INCLUDE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)!include[ \t]+(.+?)[ \t]*\r?$").unwrap());

/// Prepared `PlantUML` source with the warnings produced on the way.
#[derive(Debug)]
pub struct PreparedSource {
    /// Source handed to the renderer and used for the cache key.
    pub source: String,
    /// Unresolved includes and similar problems.
    pub warnings: Vec<String>,
}

/// Resolve includes and make sure the source has a start/end pair.
#[must_use]
pub fn prepare_source(source: &str, include_dirs: &[PathBuf]) -> PreparedSource {
    let mut warnings = Vec::new();
    let resolved = resolve_includes(source, include_dirs, 0, &mut warnings);

    let source = if resolved.contains("@startuml") {
        resolved
    } else {
        format!("@startuml\n{}\n@enduml\n", resolved.trim_end())
    };

    PreparedSource { source, warnings }
}

fn resolve_includes(
    source: &str,
    include_dirs: &[PathBuf],
    depth: usize,
    warnings: &mut Vec<String>,
) -> String {
    if depth > MAX_INCLUDE_DEPTH {
        warnings.push(format!(
            "Include depth exceeded maximum of {MAX_INCLUDE_DEPTH}"
        ));
        return source.to_owned();
    }

    INCLUDE_PATTERN
        .replace_all(source, |caps: &Captures<'_>| {
            let indent = &caps[1];
            let target = caps[2].trim();

            // <stdlib> includes are handled by the jar itself
            if target.starts_with('<') && target.ends_with('>') {
                return caps[0].to_owned();
            }

            match find_include(target, include_dirs) {
                Some(content) => {
                    let nested = resolve_includes(&content, include_dirs, depth + 1, warnings);
                    indent_lines(nested.trim_end_matches('\n'), indent)
                }
                None => {
                    warnings.push(unresolved_message(target, include_dirs));
                    caps[0].to_owned()
                }
            }
        })
        .into_owned()
}

fn find_include(target: &str, include_dirs: &[PathBuf]) -> Option<String> {
    include_dirs
        .iter()
        .map(|dir| dir.join(target))
        .find_map(|path| std::fs::read_to_string(path).ok())
}

fn unresolved_message(target: &str, include_dirs: &[PathBuf]) -> String {
    if include_dirs.is_empty() {
        return format!("Include file not found: '{target}' (no include directories configured)");
    }
    let searched: Vec<String> = include_dirs
        .iter()
        .map(|dir| Path::new(dir).join(target).display().to_string())
        .collect();
    format!(
        "Include file not found: '{target}' (searched: {})",
        searched.join(", ")
    )
}

/// Prefix every non-empty line with `indent`.
fn indent_lines(content: &str, indent: &str) -> String {
    if indent.is_empty() {
        return content.to_owned();
    }
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
