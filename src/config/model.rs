// src/config/model.rs

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// Configuration exactly as read from TOML, before validation.
///
/// Every section is optional; a missing file is equivalent to an empty one
/// and yields the built-in path table:
///
/// ```toml
/// [paths.src]
/// scss = "./src/scss/*.scss"
///
/// [paths.dest]
/// css = "./dist/css"
///
/// [server]
/// port = 3000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Runtime behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Source globs and destination directories from `[paths.*]`.
    #[serde(default)]
    pub paths: PathsSection,

    /// Dev server from `[server]`.
    #[serde(default)]
    pub server: ServerSection,

    /// Stylesheet post-processing from `[css]`.
    #[serde(default)]
    pub css: CssSection,

    /// Image optimizers from `[images]`.
    #[serde(default)]
    pub images: ImagesSection,

    /// Watcher tuning from `[watch]`.
    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on every path category being present and every glob
/// compiling.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub server: ServerSection,
    pub css: CssSection,
    pub images: ImagesSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            paths: raw.paths,
            server: raw.server,
            css: raw.css,
            images: raw.images,
            watch: raw.watch,
        }
    }

    /// The built-in configuration (what an absent config file means).
    pub fn defaults() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigSection {
    /// `"queue"` or `"cancel"`; see [`TriggerWhileRunningBehaviour`].
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of follow-up runs remembered while a run is active.
    pub queue_length: usize,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: 1,
        }
    }
}

/// `[paths]` section: `[paths.src]` and `[paths.dest]`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    #[serde(default)]
    pub src: SourcePaths,
    #[serde(default)]
    pub dest: DestPaths,
}

/// Source glob per asset category.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub html: String,
    pub scss: String,
    pub images: String,
    pub js: String,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            html: "./src/**/*.html".to_string(),
            scss: "./src/scss/*.scss".to_string(),
            images: "./src/images/**/*".to_string(),
            js: "./src/js/**/*.js".to_string(),
        }
    }
}

/// Destination directory per asset category.
///
/// `css_unminified` is the source-adjacent copy of the compiled stylesheets
/// that pages served from the source tree link to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DestPaths {
    pub html: String,
    pub css: String,
    pub css_unminified: String,
    pub images: String,
    pub js: String,
}

impl Default for DestPaths {
    fn default() -> Self {
        Self {
            html: "./dist/".to_string(),
            css: "./dist/css".to_string(),
            css_unminified: "./src/css/".to_string(),
            images: "./dist/images/".to_string(),
            js: "./dist/js".to_string(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Directory served as the static root.
    pub root: String,
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            root: "./src".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// `[css]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CssSection {
    /// Browserslist query deciding which vendor prefixes are emitted.
    pub browsers: String,
}

impl Default for CssSection {
    fn default() -> Self {
        Self {
            browsers: "defaults".to_string(),
        }
    }
}

/// `[images]` section.
///
/// The GIF, JPEG and SVG optimizers are external programs fed through
/// stdin/stdout. An empty command string copies that format verbatim.
/// `{svgo_config}` in the svg command expands to a bundled svgo config that
/// keeps `viewBox`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    /// oxipng preset, 0 (fast) ..= 6 (smallest).
    pub png_level: u8,
    pub gif: String,
    pub jpeg: String,
    pub svg: String,
}

impl Default for ImagesSection {
    fn default() -> Self {
        Self {
            png_level: 5,
            gif: "gifsicle --interlace".to_string(),
            jpeg: "jpegtran -copy none -optimize -progressive".to_string(),
            svg: "svgo --config {svgo_config} --input - --output -".to_string(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// How long to let a burst of filesystem events settle before matching.
    pub debounce_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self { debounce_ms: 50 }
    }
}
