//! `PlantUML` jar backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use md2cf_config::PlantUmlConfig;

use super::DiagramRenderer;
use crate::consts::{HOME_PLANTUML_JAR, PROJECT_PLANTUML_JAR};
use crate::error::RenderError;
use crate::options::RenderOptions;
use crate::process::{ProcessRunner, move_file};

const NAME: &str = "plantuml";

/// Find the `PlantUML` jar.
///
/// Candidates in priority order: `explicit`, `project_dir/plantuml.jar`,
/// `~/plantuml.jar`. The first existing file wins.
#[must_use]
pub fn resolve_jar(explicit: Option<&Path>, project_dir: &Path) -> Option<PathBuf> {
    let home_jar = PathBuf::from(shellexpand::tilde(HOME_PLANTUML_JAR).as_ref());
    first_existing(explicit, project_dir, &home_jar)
}

fn first_existing(explicit: Option<&Path>, project_dir: &Path, home_jar: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit
        && !path.is_file()
    {
        tracing::warn!(path = %path.display(), "PLANTUML_JAR does not exist, trying default locations");
    }

    explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain([project_dir.join(PROJECT_PLANTUML_JAR), home_jar.to_path_buf()])
        .find(|candidate| candidate.is_file())
}

/// Renders `PlantUML` sources with `java -jar plantuml.jar`.
#[derive(Debug, Clone)]
pub struct PlantUmlJar {
    java: String,
    jar: PathBuf,
    scratch_dir: PathBuf,
    runner: ProcessRunner,
}

impl PlantUmlJar {
    /// Backend using an explicit jar.
    #[must_use]
    pub fn new(
        java: impl Into<String>,
        jar: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        runner: ProcessRunner,
    ) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            scratch_dir: scratch_dir.into(),
            runner,
        }
    }

    /// Resolve the jar from configuration.
    ///
    /// Returns the reason as an error when no jar exists.
    pub fn locate(
        config: &PlantUmlConfig,
        project_dir: &Path,
        scratch_dir: &Path,
        runner: ProcessRunner,
    ) -> Result<Self, String> {
        let jar = resolve_jar(config.jar.as_deref(), project_dir).ok_or_else(|| {
            format!("no jar found (PLANTUML_JAR, ./{PROJECT_PLANTUML_JAR}, {HOME_PLANTUML_JAR})")
        })?;
        tracing::debug!(jar = %jar.display(), "Found PlantUML jar");
        Ok(Self::new(config.java.as_str(), jar, scratch_dir, runner))
    }
}

impl DiagramRenderer for PlantUmlJar {
    fn render(
        &self,
        source: &str,
        _options: &RenderOptions,
        out_file: &Path,
    ) -> Result<(), RenderError> {
        let io_err = |source| RenderError::Io {
            renderer: NAME,
            source,
        };

        std::fs::create_dir_all(&self.scratch_dir).map_err(io_err)?;
        let work = tempfile::Builder::new()
            .prefix("plantuml-")
            .tempdir_in(&self.scratch_dir)
            .map_err(io_err)?;
        let input = work.path().join("diagram.puml");
        let out_dir = work.path().join("out");
        std::fs::write(&input, source).map_err(io_err)?;

        let mut command = Command::new(&self.java);
        command
            .arg("-jar")
            .arg(&self.jar)
            .arg("-tpng")
            .arg(&input)
            .arg("-o")
            .arg(&out_dir);
        self.runner.run(command, NAME)?;

        // The file is named after `@startuml <name>`, or the input file without one
        let Some(produced) = first_png(&out_dir) else {
            return Err(RenderError::MissingOutput {
                renderer: NAME,
                path: out_dir,
            });
        };
        move_file(&produced, out_file).map_err(io_err)
    }
}

/// First PNG in `dir` by name. Multi-page diagrams add numbered siblings.
fn first_png(dir: &Path) -> Option<PathBuf> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        })
        .collect();
    images.sort();
    images.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_jar_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.jar");
        let project = dir.path().join("project");
        std::fs::create_dir(&project).unwrap();
        std::fs::write(&explicit, b"jar").unwrap();
        std::fs::write(project.join("plantuml.jar"), b"jar").unwrap();

        let found = first_existing(Some(explicit.as_path()), &project, &dir.path().join("home.jar"));

        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn test_missing_explicit_falls_back_to_project() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plantuml.jar"), b"jar").unwrap();

        let found = first_existing(
            Some(dir.path().join("absent.jar").as_path()),
            dir.path(),
            &dir.path().join("home.jar"),
        );

        assert_eq!(found, Some(dir.path().join("plantuml.jar")));
    }

    #[test]
    fn test_home_jar_last() {
        let dir = tempfile::tempdir().unwrap();
        let home_jar = dir.path().join("home.jar");
        std::fs::write(&home_jar, b"jar").unwrap();

        let found = first_existing(None, &dir.path().join("project"), &home_jar);

        assert_eq!(found, Some(home_jar));
    }

    #[test]
    fn test_no_jar() {
        let dir = tempfile::tempdir().unwrap();

        let found = first_existing(None, dir.path(), &dir.path().join("home.jar"));

        assert_eq!(found, None);
    }

    #[test]
    fn test_locate_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlantUmlConfig {
            jar: Some(dir.path().join("absent.jar")),
            ..PlantUmlConfig::default()
        };

        // The user's home may hold a real jar; only check the error text when it does not.
        if let Err(reason) =
            PlantUmlJar::locate(&config, dir.path(), dir.path(), ProcessRunner::default())
        {
            assert!(reason.contains("PLANTUML_JAR"), "{reason}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_render_moves_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // Stand-in for java: `-jar <jar> -tpng <input> -o <dir>` writes <dir>/diagram.png
        let java = dir.path().join("fake-java");
        std::fs::write(&java, "#!/bin/sh\nmkdir -p \"$6\"\ncp \"$4\" \"$6/diagram.png\"\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        let backend = PlantUmlJar::new(
            java.to_string_lossy(),
            dir.path().join("plantuml.jar"),
            dir.path().join("scratch"),
            ProcessRunner::default(),
        );
        let out = dir.path().join("out.png");

        backend
            .render("@startuml\nA -> B\n@enduml", &RenderOptions::default(), &out)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "@startuml\nA -> B\n@enduml"
        );
        assert_eq!(std::fs::read_dir(dir.path().join("scratch")).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_render_picks_up_named_output() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        // `@startuml flow` makes PlantUML write flow.png
        let java = dir.path().join("fake-java");
        std::fs::write(&java, "#!/bin/sh\nmkdir -p \"$6\"\nprintf flow > \"$6/flow.png\"\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        let backend = PlantUmlJar::new(
            java.to_string_lossy(),
            dir.path().join("plantuml.jar"),
            dir.path().join("scratch"),
            ProcessRunner::default(),
        );
        let out = dir.path().join("out.png");

        backend
            .render("@startuml flow\nA -> B\n@enduml", &RenderOptions::default(), &out)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "flow");
    }

    #[test]
    fn test_first_png_by_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("flow_001.png"), b"2").unwrap();
        std::fs::write(dir.path().join("flow.png"), b"1").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        assert_eq!(first_png(dir.path()), Some(dir.path().join("flow.png")));
        assert_eq!(first_png(&dir.path().join("missing")), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_render_without_output_fails() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("fake-java");
        std::fs::write(&java, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();
        let backend = PlantUmlJar::new(
            java.to_string_lossy(),
            dir.path().join("plantuml.jar"),
            dir.path().join("scratch"),
            ProcessRunner::default(),
        );

        let err = backend
            .render("A -> B", &RenderOptions::default(), &dir.path().join("out.png"))
            .unwrap_err();

        assert!(matches!(err, RenderError::MissingOutput { .. }));
    }
}
