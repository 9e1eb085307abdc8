//! Configuration module for objmeta.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, GenerationSettings, LoggingSettings, SchemaSettings, Settings, SettingsError,
    TableNaming,
};
