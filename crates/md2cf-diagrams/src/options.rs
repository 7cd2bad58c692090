//! Render options passed to renderer backends.

use std::ffi::OsString;
use std::path::PathBuf;

use md2cf_config::MermaidConfig;

/// Options forwarded to the renderer.
///
/// Only the Mermaid CLI understands them; the `PlantUML` jar ignores them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Page width.
    pub width: Option<String>,
    /// Page height.
    pub height: Option<String>,
    /// Device scale factor.
    pub scale: Option<String>,
    /// Background color, e.g. `transparent` or `#ffffff`.
    pub background_color: Option<String>,
    /// Mermaid theme name.
    pub theme: Option<String>,
    /// Mermaid JSON configuration file.
    pub config_file: Option<PathBuf>,
}

impl RenderOptions {
    /// Command-line arguments for `mmdc`, in a fixed order.
    #[must_use]
    pub fn mermaid_args(&self) -> Vec<OsString> {
        let flags = [
            ("-w", &self.width),
            ("-H", &self.height),
            ("-s", &self.scale),
            ("-b", &self.background_color),
            ("-t", &self.theme),
        ];

        let mut args = Vec::new();
        for (flag, value) in flags {
            if let Some(value) = value {
                args.push(OsString::from(flag));
                args.push(OsString::from(value));
            }
        }
        if let Some(config_file) = &self.config_file {
            args.push(OsString::from("-c"));
            args.push(config_file.clone().into_os_string());
        }
        args
    }
}

impl From<&MermaidConfig> for RenderOptions {
    fn from(config: &MermaidConfig) -> Self {
        Self {
            width: config.width.clone(),
            height: config.height.clone(),
            scale: config.scale.clone(),
            background_color: config.background_color.clone(),
            theme: config.theme.clone(),
            config_file: config.config_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_has_no_args() {
        assert!(RenderOptions::default().mermaid_args().is_empty());
    }

    #[test]
    fn test_mermaid_args_order() {
        let options = RenderOptions {
            width: Some("1200".to_owned()),
            height: None,
            scale: Some("2".to_owned()),
            background_color: Some("transparent".to_owned()),
            theme: Some("forest".to_owned()),
            config_file: Some(PathBuf::from("/etc/mermaid.json")),
        };

        let args: Vec<String> = options
            .mermaid_args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-w",
                "1200",
                "-s",
                "2",
                "-b",
                "transparent",
                "-t",
                "forest",
                "-c",
                "/etc/mermaid.json"
            ]
        );
    }

    #[test]
    fn test_from_mermaid_config() {
        let config = MermaidConfig {
            theme: Some("dark".to_owned()),
            height: Some("600".to_owned()),
            ..MermaidConfig::default()
        };

        let options = RenderOptions::from(&config);

        assert_eq!(options.theme.as_deref(), Some("dark"));
        assert_eq!(options.height.as_deref(), Some("600"));
        assert_eq!(options.width, None);
    }
}
