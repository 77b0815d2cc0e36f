//! Configuration management for the bb markup tools.
//!
//! Parses `bb.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`]. Validation
//! runs after they are applied, so overrides are held to the same rules as
//! file values.
//!
//! ```toml
//! [input]
//! max_bytes = 65536
//!
//! [render]
//! youtube_host = "www.youtube-nocookie.com"
//! link_rel = "noopener noreferrer nofollow"
//!
//! [export]
//! default_colors = ["#000000", "#ffffff"]
//! ```

use std::path::{Path, PathBuf};

use bb_markup::{ExportOptions, RenderOptions, sanitize_color};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "bb.toml";

/// Default input size limit in bytes.
const DEFAULT_MAX_BYTES: usize = 64 * 1024;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the input size limit.
    pub max_bytes: Option<usize>,
    /// Override the video embed host.
    pub youtube_host: Option<String>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input limits.
    pub input: InputConfig,
    /// Renderer and importer settings.
    pub render: RenderConfig,
    /// Exporter settings.
    pub export: ExportConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Input limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Largest accepted markup or HTML input, in bytes.
    pub max_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Renderer and importer settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Host serving embedded video frames, without scheme.
    pub youtube_host: String,
    /// `rel` attribute for outbound links.
    pub link_rel: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let RenderOptions {
            youtube_host,
            link_rel,
        } = RenderOptions::default();
        Self {
            youtube_host,
            link_rel,
        }
    }
}

/// Exporter settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Ink colors treated as "no color" when exporting.
    pub default_colors: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_colors: ExportOptions::default().default_colors,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `bb.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Options for the renderer and importer.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            youtube_host: self.render.youtube_host.clone(),
            link_rel: self.render.link_rel.clone(),
        }
    }

    /// Options for the exporter.
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            default_colors: self.export.default_colors.clone(),
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_input()?;
        self.validate_render()?;
        self.validate_export()?;
        Ok(())
    }

    fn validate_input(&self) -> Result<(), ConfigError> {
        if self.input.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "input.max_bytes must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        let host = &self.render.youtube_host;
        require_non_empty(host, "render.youtube_host")?;
        if host.contains("://") || host.contains('/') {
            return Err(ConfigError::Validation(
                "render.youtube_host must be a bare host name without scheme or path".to_owned(),
            ));
        }
        if host.contains(|c: char| c.is_whitespace() || c == '"' || c == '<' || c == '>') {
            return Err(ConfigError::Validation(
                "render.youtube_host contains invalid characters".to_owned(),
            ));
        }

        let rel: Vec<_> = self.render.link_rel.split_whitespace().collect();
        for required in ["noopener", "noreferrer"] {
            if !rel.contains(&required) {
                return Err(ConfigError::Validation(format!(
                    "render.link_rel must include {required}"
                )));
            }
        }
        Ok(())
    }

    fn validate_export(&self) -> Result<(), ConfigError> {
        for color in &self.export.default_colors {
            if sanitize_color(color).is_none() {
                return Err(ConfigError::Validation(format!(
                    "export.default_colors contains invalid color {color:?}"
                )));
            }
        }
        Ok(())
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(max_bytes) = settings.max_bytes {
            self.input.max_bytes = max_bytes;
        }
        if let Some(host) = &settings.youtube_host {
            self.render.youtube_host.clone_from(host);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }
}
