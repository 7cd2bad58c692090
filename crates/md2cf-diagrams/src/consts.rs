//! Internal constants for diagram rendering.

use std::time::Duration;

/// File extension of rendered diagrams.
pub const IMAGE_EXTENSION: &str = "png";

/// Jar looked up relative to the project directory.
pub const PROJECT_PLANTUML_JAR: &str = "plantuml.jar";

/// Jar looked up in the user's home directory (tilde-expanded).
pub const HOME_PLANTUML_JAR: &str = "~/plantuml.jar";

/// Maximum nesting of `PlantUML` `!include` directives.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// How often a running renderer is polled when a timeout is set.
pub const PROCESS_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of stderr bytes kept in an error message.
pub const MAX_STDERR_BYTES: usize = 4096;
