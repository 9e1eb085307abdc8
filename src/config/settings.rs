//! TOML-based configuration for objmeta.
//!
//! Example configuration:
//! ```toml
//! [schema]
//! path = "${SCHEMA_DIR}/objects.json"
//!
//! [generation]
//! off_heap = true
//! initialize_primitives_to_null = false
//! ignore_package_naming_convention = false
//! default_table_naming = "upper_snake"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where to find the schema manifest when none is given on the command line.
    pub schema: SchemaSettings,

    /// Defaults applied while resolving objects.
    pub generation: GenerationSettings,

    /// Logging configuration.
    pub logging: LoggingSettings,
}

/// Schema manifest location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Path to the manifest (supports ${ENV_VAR} expansion).
    pub path: Option<String>,
}

impl SchemaSettings {
    /// The manifest path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        self.path
            .as_deref()
            .map(|p| expand_env_vars(p).map(PathBuf::from))
            .transpose()
    }
}

/// How a table name is derived when an object does not declare one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableNaming {
    /// `OrderLine` -> `ORDER_LINE`
    #[default]
    UpperSnake,
    /// `OrderLine` -> `OrderLine`
    ClassName,
}

impl TableNaming {
    pub fn table_for(&self, class_name: &str) -> String {
        use inflector::Inflector;
        match self {
            TableNaming::UpperSnake => class_name.to_snake_case().to_uppercase(),
            TableNaming::ClassName => class_name.to_string(),
        }
    }
}

/// Resolution defaults; objects may override some of them individually.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Compute the compact off-heap layout for objects that qualify.
    pub off_heap: bool,

    /// Start every null bit set, so primitives read as null until assigned.
    pub initialize_primitives_to_null: bool,

    /// Skip the lowercase package name check.
    pub ignore_package_naming_convention: bool,

    pub default_table_naming: TableNaming,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `OBJMETA_CONFIG`
    /// 2. `./objmeta.toml`
    /// 3. `~/.config/objmeta/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("OBJMETA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("objmeta.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("objmeta").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }
        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };
        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
