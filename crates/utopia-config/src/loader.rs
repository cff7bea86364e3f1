//! Configuration loading from strings and files

use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::MarkdownConfig;
use crate::error::{ConfigError, ConfigResult};

/// Serialization format of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Loads and validates [`MarkdownConfig`]
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a configuration document
    pub fn load_from_str(content: &str, format: ConfigFormat) -> ConfigResult<MarkdownConfig> {
        let config: MarkdownConfig = match format {
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::parse(format.to_string(), e))?,
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::parse(format.to_string(), e))?
            }
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::parse(format.to_string(), e))?,
            #[allow(unreachable_patterns)]
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file, detecting the format from its extension
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<MarkdownConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        debug!(path = %path.display(), %format, "loading markdown configuration");
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<MarkdownConfig> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Ok(MarkdownConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("a/markdown.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("markdown.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("markdown.ini")),
            Err(ConfigError::UnsupportedFormat(ext)) if ext == "ini"
        ));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_load_toml() {
        let content = r##"
[suggestion]
mention_limit = 5

[tags]
new_tag_color = "#123456"
"##;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.suggestion.mention_limit, 5);
        assert_eq!(config.suggestion.hashtag_match_limit, 7);
        assert_eq!(config.tags.new_tag_color, "#123456");
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_load_yaml() {
        let content = "preview:\n  truncate_limit: 120\n";
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.preview.truncate_limit, Some(120));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let content = r#"{"suggestion": {"hashtag_match_limit": 0}}"#;
        let err = ConfigLoader::load_from_str(content, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = ConfigLoader::load_from_str("{", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref format, .. } if format == "json"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"editor": {{"placeholder": "Describe the place"}}}}"#).unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.editor.placeholder, "Describe the place");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MarkdownConfig::default());
    }
}
