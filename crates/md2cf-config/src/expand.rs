//! Environment variable and home directory expansion for path values.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `~` / `~/...` - expands to the user's home directory

use std::path::PathBuf;

use crate::ConfigError;

/// Expand `${VAR}` references using `lookup`.
///
/// Returns the original string unchanged if no `${` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env<F>(value: &str, key: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Fast path: no expansion needed
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        match lookup(var) {
            Some(val) => Ok(Some(val)),
            None => Err(LookupError {
                var_name: var.to_owned(),
            }),
        }
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        key: key.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Expand `${VAR}` references, then a leading `~`, and return a path.
pub(crate) fn expand_path<F>(value: &str, key: &str, lookup: &F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_env(value, key, lookup)?;
    Ok(PathBuf::from(shellexpand::tilde(&expanded).into_owned()))
}

/// Error returned when environment variable lookup fails.
struct LookupError {
    var_name: String,
}
