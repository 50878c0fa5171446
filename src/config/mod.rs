// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed data model with the built-in defaults.
//! - `loader.rs`: reading a config file (or falling back to defaults).
//! - `validate.rs`: path-table completeness, glob and option sanity.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    DEFAULT_CONFIG_FILE, default_config_path, load_and_validate, load_from_path, load_or_default,
};
pub use model::{
    ConfigFile, ConfigSection, CssSection, DestPaths, ImagesSection, PathsSection,
    RawConfigFile, ServerSection, SourcePaths, WatchSection,
};
pub use validate::validate_config;
