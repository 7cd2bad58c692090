//! Configuration management for md2cf.
//!
//! All settings come from the process environment. [`Config::from_env`] reads
//! the real environment; [`Config::from_lookup`] takes any lookup function,
//! which keeps tests away from global state.
//!
//! CLI settings are applied on top via [`Config::apply_cli_settings`].
//!
//! ## Recognized keys
//!
//! | Key | Field |
//! |-----|-------|
//! | `MD2CF_DEBUG` | [`Config::debug`] |
//! | `MD2CF_WORK_DIR` | [`Config::work_dir`] |
//! | `MD2CF_CACHE_DIR` | [`Config::cache_dir`] |
//! | `MD2CF_IMAGE_DIR` | [`Config::image_dir`] |
//! | `MD2CF_LOG_TAIL` | [`Config::log_tail`] |
//! | `MD2CF_RENDER_TIMEOUT` | [`Config::render_timeout`] |
//! | `MD2CF_MERMAID`, `MD2CF_MERMAID_CLI`, `MERMAID_*` | [`MermaidConfig`] |
//! | `MD2CF_PLANTUML`, `PLANTUML_JAR`, `MD2CF_JAVA`, `PLANTUML_INCLUDE_DIRS` | [`PlantUmlConfig`] |
//!
//! ## Value syntax
//!
//! - Booleans accept `1`, `true`, `yes`, `on` and `0`, `false`, `no`, `off`
//!   (case-insensitive). An empty value counts as unset.
//! - Path values support `${VAR}` references and a leading `~`.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the diagnostic log file inside the working directory.
const DIAGNOSTIC_LOG_FILENAME: &str = "md2cf-render.log";

/// Default number of diagnostic log lines shown after a failure.
const DEFAULT_LOG_TAIL: usize = 20;

/// Default renderer subprocess timeout in seconds.
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;

/// CLI settings that override environment values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the output asset directory.
    pub image_dir: Option<PathBuf>,
    /// Override the debug flag.
    pub debug: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inherit renderer stdio instead of capturing it into the diagnostic log.
    pub debug: bool,
    /// Temp-rooted working directory for scratch files and the diagnostic log.
    pub work_dir: PathBuf,
    /// Directory of content-hashed rendered images.
    pub cache_dir: PathBuf,
    /// Output asset directory populated with attachments.
    pub image_dir: PathBuf,
    /// Number of diagnostic log lines to surface after a failed render.
    pub log_tail: usize,
    /// Per-subprocess timeout (`None` waits forever).
    pub render_timeout: Option<Duration>,
    /// Mermaid backend settings.
    pub mermaid: MermaidConfig,
    /// `PlantUML` backend settings.
    pub plantuml: PlantUmlConfig,
}

/// Mermaid CLI backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MermaidConfig {
    /// Whether the backend may be used at all.
    pub enabled: bool,
    /// Command name or path of the Mermaid CLI.
    pub command: String,
    /// `-w` (page width).
    pub width: Option<String>,
    /// `-H` (page height).
    pub height: Option<String>,
    /// `-s` (device scale factor).
    pub scale: Option<String>,
    /// `-b` (background color).
    pub background_color: Option<String>,
    /// `-t` (theme).
    pub theme: Option<String>,
    /// `-c` (mermaid JSON config file).
    pub config_file: Option<PathBuf>,
}

impl Default for MermaidConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "mmdc".to_owned(),
            width: None,
            height: None,
            scale: None,
            background_color: None,
            theme: None,
            config_file: None,
        }
    }
}

/// `PlantUML` jar backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlantUmlConfig {
    /// Whether the backend may be used at all.
    pub enabled: bool,
    /// Explicit jar path (`PLANTUML_JAR`), already tilde-expanded.
    pub jar: Option<PathBuf>,
    /// Java launcher command.
    pub java: String,
    /// Directories searched for `!include` files.
    pub include_dirs: Vec<PathBuf>,
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            jar: None,
            java: "java".to_owned(),
            include_dirs: Vec::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Value is not boolean-like.
    #[error("{key}: expected a boolean (true/false, yes/no, on/off, 1/0), got '{value}'")]
    InvalidBool {
        /// Environment key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Value is not a non-negative integer.
    #[error("{key}: expected a non-negative integer, got '{value}'")]
    InvalidNumber {
        /// Environment key.
        key: String,
        /// Offending value.
        value: String,
    },
    /// Environment variable error during expansion.
    #[error("Environment variable error in {key}: {message}")]
    EnvVar {
        /// Environment key whose value was being expanded.
        key: String,
        /// Error message (e.g., "${`JAR_HOME`} not set").
        message: String,
    },
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` to read keys.
    ///
    /// Relative directories stay relative; they are resolved against the
    /// current directory by whoever opens them.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup: &lookup };

        let work_dir = env
            .path("MD2CF_WORK_DIR")?
            .unwrap_or_else(|| std::env::temp_dir().join("md2cf"));
        let cache_dir = env
            .path("MD2CF_CACHE_DIR")?
            .unwrap_or_else(|| work_dir.join("cache"));
        let image_dir = env
            .path("MD2CF_IMAGE_DIR")?
            .unwrap_or_else(|| PathBuf::from("attachments"));

        let render_timeout = match env.number("MD2CF_RENDER_TIMEOUT")? {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)),
        };

        let mermaid = MermaidConfig {
            enabled: env.flag("MD2CF_MERMAID")?.unwrap_or(true),
            command: env
                .string("MD2CF_MERMAID_CLI")
                .unwrap_or_else(|| MermaidConfig::default().command),
            width: env.string("MERMAID_WIDTH"),
            height: env.string("MERMAID_HEIGHT"),
            scale: env.string("MERMAID_SCALE"),
            background_color: env.string("MERMAID_BACKGROUND_COLOR"),
            theme: env.string("MERMAID_THEME"),
            config_file: env.path("MERMAID_CONFIG_FILE")?,
        };

        let plantuml = PlantUmlConfig {
            enabled: env.flag("MD2CF_PLANTUML")?.unwrap_or(true),
            jar: env.path("PLANTUML_JAR")?,
            java: env
                .string("MD2CF_JAVA")
                .unwrap_or_else(|| PlantUmlConfig::default().java),
            include_dirs: env.path_list("PLANTUML_INCLUDE_DIRS")?,
        };

        Ok(Self {
            debug: env.flag("MD2CF_DEBUG")?.unwrap_or(false),
            work_dir,
            cache_dir,
            image_dir,
            log_tail: env
                .number("MD2CF_LOG_TAIL")?
                .map_or(DEFAULT_LOG_TAIL, |n| usize::try_from(n).unwrap_or(usize::MAX)),
            render_timeout,
            mermaid,
            plantuml,
        })
    }

    /// Apply CLI overrides.
    pub fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(image_dir) = &settings.image_dir {
            self.image_dir.clone_from(image_dir);
        }
        if let Some(debug) = settings.debug {
            self.debug = debug;
        }
    }

    /// Path of the append-only diagnostic log.
    #[must_use]
    pub fn diagnostic_log_path(&self) -> PathBuf {
        self.work_dir.join(DIAGNOSTIC_LOG_FILENAME)
    }

    /// Scratch directory for renderer input/output files.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.work_dir.join("scratch")
    }
}

/// Parse a boolean-like value.
///
/// Returns `None` for values that are not recognized.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Typed accessors over a lookup function.
struct Env<'a, F> {
    lookup: &'a F,
}

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed, non-empty value of `key`.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.string(key)
            .map(|value| {
                parse_bool(&value).ok_or_else(|| ConfigError::InvalidBool {
                    key: key.to_owned(),
                    value,
                })
            })
            .transpose()
    }

    fn number(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        self.string(key)
            .map(|value| {
                value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                    key: key.to_owned(),
                    value,
                })
            })
            .transpose()
    }

    fn path(&self, key: &str) -> Result<Option<PathBuf>, ConfigError> {
        self.string(key)
            .map(|value| expand::expand_path(&value, key, self.lookup))
            .transpose()
    }

    fn path_list(&self, key: &str) -> Result<Vec<PathBuf>, ConfigError> {
        let Some(value) = self.string(key) else {
            return Ok(Vec::new());
        };
        std::env::split_paths(&value)
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| expand::expand_path(&p.to_string_lossy(), key, self.lookup))
            .collect()
    }
}

/// Resolve `path` against `base` unless it is already absolute.
#[must_use]
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
