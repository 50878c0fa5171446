// src/config/validate.rs

use globset::Glob;
use lightningcss::targets::Browsers;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetflowError, Result};

/// Highest oxipng preset.
const MAX_PNG_LEVEL: u8 = 6;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Run every check against a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_path_table(cfg)?;
    validate_server(cfg)?;
    validate_css(cfg)?;
    validate_images(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.queue_length == 0 {
        return Err(AssetflowError::Config(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Every category needs both a source glob and a destination directory.
fn validate_path_table(cfg: &RawConfigFile) -> Result<()> {
    let src = &cfg.paths.src;
    let dest = &cfg.paths.dest;

    let sources = [
        ("html", &src.html),
        ("scss", &src.scss),
        ("images", &src.images),
        ("js", &src.js),
    ];
    for (category, pattern) in sources {
        if pattern.trim().is_empty() {
            return Err(AssetflowError::Config(format!(
                "[paths.src].{category} must not be empty"
            )));
        }
        if let Err(err) = Glob::new(normalize(pattern)) {
            return Err(AssetflowError::Config(format!(
                "[paths.src].{category} is not a valid glob ({pattern}): {err}"
            )));
        }
    }

    let dests = [
        ("html", &dest.html),
        ("css", &dest.css),
        ("css_unminified", &dest.css_unminified),
        ("images", &dest.images),
        ("js", &dest.js),
    ];
    for (category, dir) in dests {
        if dir.trim().is_empty() {
            return Err(AssetflowError::Config(format!(
                "[paths.dest].{category} must not be empty"
            )));
        }
    }

    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.root.trim().is_empty() {
        return Err(AssetflowError::Config(
            "[server].root must not be empty".to_string(),
        ));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(AssetflowError::Config(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_css(cfg: &RawConfigFile) -> Result<()> {
    Browsers::from_browserslist([cfg.css.browsers.as_str()]).map_err(|err| {
        AssetflowError::Config(format!(
            "[css].browsers is not a valid browserslist query ({}): {err}",
            cfg.css.browsers
        ))
    })?;
    Ok(())
}

fn validate_images(cfg: &RawConfigFile) -> Result<()> {
    if cfg.images.png_level > MAX_PNG_LEVEL {
        return Err(AssetflowError::Config(format!(
            "[images].png_level must be between 0 and {MAX_PNG_LEVEL} (got {})",
            cfg.images.png_level
        )));
    }
    Ok(())
}

fn normalize(pattern: &str) -> &str {
    pattern.trim().trim_start_matches("./")
}
