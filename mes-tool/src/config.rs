use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use mes_nls::Encoding;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "mestool.toml";

/// Logger configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    /// Level for this workspace's own crates.
    pub app_level_filter: LevelFilter,
    /// Level for everything else.
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            app_level_filter: LevelFilter::Info,
            level_filter: LevelFilter::Warn,
        }
    }
}

/// Settings read from `mestool.toml`. Every field is optional in the file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Name of the legacy encoding of script text, e.g. `sjis`.
    pub encoding: String,
    /// Extension of script files picked up from a folder.
    pub script_extension: String,
    /// Extension of the exported text next to each script.
    pub text_extension: String,
    /// Folder, next to the scripts, that rebuilt scripts are written to.
    pub rebuild_dir: String,
    pub logger: LoggerConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            encoding: "sjis".to_string(),
            script_extension: "mes".to_string(),
            text_extension: "txt".to_string(),
            rebuild_dir: "rebuild".to_string(),
            logger: LoggerConfig::default(),
        }
    }
}

impl ToolConfig {
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: ToolConfig = toml::from_str(s)?;
        config.encoding()?;
        Ok(config)
    }

    /// Read `path` if given, otherwise `mestool.toml` in the working directory
    /// if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let s = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn encoding(&self) -> Result<Encoding> {
        Ok(self.encoding.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_defaults() {
        assert_eq!(ToolConfig::from_toml("").unwrap(), ToolConfig::default());
    }

    #[test]
    fn partial_file() {
        let config = ToolConfig::from_toml(
            r#"
encoding = "gbk"
rebuild_dir = "out"

[logger]
app_level_filter = "debug"
"#,
        )
        .unwrap();
        assert_eq!(config.encoding().unwrap(), Encoding::Gbk);
        assert_eq!(config.rebuild_dir, "out");
        assert_eq!(config.script_extension, "mes");
        assert_eq!(config.logger.app_level_filter, LevelFilter::Debug);
        assert_eq!(config.logger.level_filter, LevelFilter::Warn);
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(ToolConfig::from_toml("encoding = \"ebcdic\"").is_err());
    }

    #[test]
    fn missing_explicit_file_is_error() {
        let err = ToolConfig::load(Some(Path::new("/nonexistent/mestool.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
