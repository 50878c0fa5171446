// src/paths.rs

//! The path table: where each asset category is read from and written to.
//!
//! Source globs are split into a literal *base* directory and a pattern
//! relative to that base. Files keep their base-relative path when written
//! to a destination, so `./src/**/*.html` copies `src/blog/post.html` to
//! `dist/blog/post.html`.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::config::ConfigFile;
use crate::fs::FileSystem;

/// Characters that make a path component a glob rather than a literal.
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Asset categories with a source glob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Html,
    Scss,
    Images,
    Js,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Html,
        Category::Scss,
        Category::Images,
        Category::Js,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Html => "html",
            Category::Scss => "scss",
            Category::Images => "images",
            Category::Js => "js",
        }
    }
}

/// A file matched by a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Location on disk (base joined with `relative`).
    pub path: PathBuf,
    /// Path relative to the glob base; preserved at the destination.
    pub relative: PathBuf,
}

/// A compiled source glob such as `./src/scss/*.scss`.
#[derive(Clone)]
pub struct SourceGlob {
    pattern: String,
    /// Literal directory prefix relative to the project root (`src/scss`).
    base_rel: String,
    /// `root.join(base_rel)`.
    base: PathBuf,
    matcher: GlobMatcher,
}

impl fmt::Debug for SourceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceGlob")
            .field("pattern", &self.pattern)
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl SourceGlob {
    /// Compile `pattern` relative to the project `root`.
    pub fn new(root: &Path, pattern: &str) -> Result<Self> {
        let normalized = pattern.trim().trim_start_matches("./");
        let components: Vec<&str> = normalized.split('/').filter(|c| !c.is_empty()).collect();

        let first_glob = components
            .iter()
            .position(|c| c.contains(GLOB_META))
            // A fully literal pattern names one file: its parent is the base.
            .unwrap_or(components.len().saturating_sub(1));

        let base_rel = components[..first_glob].join("/");
        let rest = components[first_glob..].join("/");

        let matcher = GlobBuilder::new(&rest)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pattern}"))?
            .compile_matcher();

        let base = if base_rel.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&base_rel)
        };

        Ok(Self {
            pattern: pattern.to_string(),
            base_rel,
            base,
            matcher,
        })
    }

    /// The pattern as written in the config.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory the glob is evaluated in.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether a path relative to the glob base matches.
    pub fn matches_relative(&self, rel: &str) -> bool {
        self.matcher.is_match(rel)
    }

    /// Whether a path relative to the *project root* matches, e.g.
    /// `"src/scss/site.scss"`. Used by the watcher.
    pub fn matches_root_relative(&self, rel: &str) -> bool {
        if self.base_rel.is_empty() {
            return self.matches_relative(rel);
        }
        match rel.strip_prefix(self.base_rel.as_str()) {
            Some(rest) => match rest.strip_prefix('/') {
                Some(rest) => self.matches_relative(rest),
                None => false,
            },
            None => false,
        }
    }

    /// Collect every file under the base matching this glob.
    ///
    /// A missing base directory yields no files. Hidden entries (names
    /// starting with `.`) are skipped. Results are sorted by path.
    pub fn collect(&self, fs: &dyn FileSystem) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        if !fs.is_dir(&self.base) {
            return Ok(files);
        }

        let mut stack = vec![self.base.clone()];
        while let Some(dir) = stack.pop() {
            for path in fs.read_dir(&dir)? {
                let hidden = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
                if hidden {
                    continue;
                }
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(&self.base) {
                        let rel_str = rel.to_string_lossy().replace('\\', "/");
                        if self.matches_relative(&rel_str) {
                            files.push(SourceFile {
                                relative: rel.to_path_buf(),
                                path,
                            });
                        }
                    }
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// Immutable mapping from asset categories to sources and destinations.
#[derive(Debug, Clone)]
pub struct PathTable {
    root: PathBuf,
    html: SourceGlob,
    scss: SourceGlob,
    images: SourceGlob,
    js: SourceGlob,
    dest_html: PathBuf,
    dest_css: PathBuf,
    dest_css_unminified: PathBuf,
    dest_images: PathBuf,
    dest_js: PathBuf,
    server_root: PathBuf,
}

impl PathTable {
    /// Resolve every entry of a validated config against the project `root`.
    pub fn from_config(cfg: &ConfigFile, root: &Path) -> Result<Self> {
        let src = &cfg.paths.src;
        let dest = &cfg.paths.dest;
        Ok(Self {
            root: root.to_path_buf(),
            html: SourceGlob::new(root, &src.html)?,
            scss: SourceGlob::new(root, &src.scss)?,
            images: SourceGlob::new(root, &src.images)?,
            js: SourceGlob::new(root, &src.js)?,
            dest_html: resolve(root, &dest.html),
            dest_css: resolve(root, &dest.css),
            dest_css_unminified: resolve(root, &dest.css_unminified),
            dest_images: resolve(root, &dest.images),
            dest_js: resolve(root, &dest.js),
            server_root: resolve(root, &cfg.server.root),
        })
    }

    /// Project root all entries are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self, category: Category) -> &SourceGlob {
        match category {
            Category::Html => &self.html,
            Category::Scss => &self.scss,
            Category::Images => &self.images,
            Category::Js => &self.js,
        }
    }

    pub fn dest_html(&self) -> &Path {
        &self.dest_html
    }

    pub fn dest_css(&self) -> &Path {
        &self.dest_css
    }

    pub fn dest_css_unminified(&self) -> &Path {
        &self.dest_css_unminified
    }

    pub fn dest_images(&self) -> &Path {
        &self.dest_images
    }

    pub fn dest_js(&self) -> &Path {
        &self.dest_js
    }

    /// Static root of the dev server.
    pub fn server_root(&self) -> &Path {
        &self.server_root
    }
}

fn resolve(root: &Path, dir: &str) -> PathBuf {
    let trimmed = dir.trim().trim_start_matches("./");
    let trimmed = trimmed.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == "." {
        root.to_path_buf()
    } else if Path::new(trimmed).is_absolute() {
        PathBuf::from(trimmed)
    } else {
        root.join(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn splits_literal_base_from_pattern() {
        let glob = SourceGlob::new(Path::new("."), "./src/scss/*.scss").unwrap();
        assert_eq!(glob.base(), Path::new("./src/scss"));
        assert!(glob.matches_relative("site.scss"));
        assert!(!glob.matches_relative("nested/site.scss"));
    }

    #[test]
    fn double_star_matches_top_level_and_nested() {
        let glob = SourceGlob::new(Path::new("."), "./src/**/*.html").unwrap();
        assert!(glob.matches_root_relative("src/index.html"));
        assert!(glob.matches_root_relative("src/blog/post.html"));
        assert!(!glob.matches_root_relative("dist/index.html"));
        assert!(!glob.matches_root_relative("srcx/index.html"));
    }

    #[test]
    fn collect_preserves_relative_paths_and_skips_hidden() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/index.html", b"<html>".to_vec());
        fs.add_file("./src/blog/post.html", b"<p>".to_vec());
        fs.add_file("./src/.cache/x.html", b"".to_vec());
        fs.add_file("./src/js/app.js", b"".to_vec());

        let glob = SourceGlob::new(Path::new("."), "./src/**/*.html").unwrap();
        let files = glob.collect(&fs).unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![PathBuf::from("blog/post.html"), PathBuf::from("index.html")]
        );
    }

    #[test]
    fn missing_base_collects_nothing() {
        let fs = MockFileSystem::new();
        let glob = SourceGlob::new(Path::new("."), "./src/images/**/*").unwrap();
        assert!(glob.collect(&fs).unwrap().is_empty());
    }

    #[test]
    fn default_table_matches_builtin_layout() {
        let table = PathTable::from_config(&ConfigFile::defaults(), Path::new("/site")).unwrap();
        assert_eq!(table.dest_css(), Path::new("/site/dist/css"));
        assert_eq!(table.dest_html(), Path::new("/site/dist"));
        assert_eq!(table.dest_css_unminified(), Path::new("/site/src/css"));
        assert_eq!(table.server_root(), Path::new("/site/src"));
        assert_eq!(table.source(Category::Js).base(), Path::new("/site/src/js"));
    }
}
