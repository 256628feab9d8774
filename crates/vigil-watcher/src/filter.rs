//! Path eligibility rules
//!
//! Decides which paths are worth tracking at all. Several sources
//! combine, in precedence order:
//! 1. Built-in rules (always enforced): hidden segments, well-known noise
//!    directories, editor temp files
//! 2. Reserved store locations (the journal and shadow directories)
//! 3. `.gitignore` patterns (optional, enabled by default)
//! 4. Extra user patterns from configuration
//!
//! The predicate is pure with respect to path names; it never looks at
//! file content. Content classification happens at read time in the
//! pipeline.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use vigil_core::RelPath;

/// Directory names that are never tracked, wherever they appear.
/// Dotted directories (`.git`, `.venv`, `.idea`, ...) are already covered
/// by the hidden-segment rule.
const NOISE_DIRS: &[&str] = &["node_modules", "__pycache__", "target", "venv"];

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to build ignore patterns: {0}")]
    Patterns(#[from] ignore::Error),
}

/// Filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Honor the watched root's `.gitignore` (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Additional gitignore-style patterns from config
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            extra_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}

/// Path eligibility predicate for one watched root.
pub struct PathFilter {
    root: PathBuf,
    /// Store locations under the root, excluded from tracking.
    reserved: Vec<RelPath>,
    gitignore: Option<Gitignore>,
    extra: Option<Gitignore>,
}

impl PathFilter {
    /// Build the filter for `root`. `reserved` names the journal and
    /// shadow locations when they live under the root.
    pub fn load(
        root: &Path,
        reserved: Vec<RelPath>,
        config: &FilterConfig,
    ) -> Result<Self, FilterError> {
        let gitignore = if config.use_gitignore {
            let gitignore_path = root.join(".gitignore");
            if gitignore_path.exists() {
                let mut builder = GitignoreBuilder::new(root);
                builder.add(&gitignore_path);
                Some(builder.build()?)
            } else {
                None
            }
        } else {
            None
        };

        let extra = if config.extra_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(root);
            for pattern in &config.extra_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        Ok(Self {
            root: root.to_path_buf(),
            reserved,
            gitignore,
            extra,
        })
    }

    /// Whether `path` may be tracked.
    pub fn is_eligible(&self, path: &RelPath) -> bool {
        if Self::has_hidden_segment(path) || Self::has_noise_segment(path) {
            return false;
        }
        if Self::is_editor_temp(path.file_name()) {
            return false;
        }
        if self.is_reserved(path) {
            return false;
        }
        if let Some(ref gitignore) = self.gitignore {
            if matches_ignore(gitignore, path) {
                return false;
            }
        }
        if let Some(ref extra) = self.extra {
            if matches_ignore(extra, path) {
                return false;
            }
        }
        true
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn has_hidden_segment(path: &RelPath) -> bool {
        path.segments().any(|s| s.starts_with('.'))
    }

    fn has_noise_segment(path: &RelPath) -> bool {
        path.segments().any(|s| NOISE_DIRS.contains(&s))
    }

    /// Editor/system temp file names worth skipping even outside hidden
    /// directories: Vim swaps, backup tildes, Emacs autosaves, OS litter,
    /// workspace metadata, Python bytecode.
    fn is_editor_temp(name: &str) -> bool {
        if name.ends_with(".swp")
            || name.ends_with(".swo")
            || name.ends_with(".swn")
            || name.ends_with(".swm")
        {
            return true;
        }
        if name.ends_with('~') {
            return true;
        }
        if name.starts_with('#') && name.ends_with('#') {
            return true;
        }
        if name == "Thumbs.db" || name == "desktop.ini" {
            return true;
        }
        if name.ends_with(".pyc") || name.ends_with(".iml") || name.ends_with(".code-workspace") {
            return true;
        }
        false
    }

    fn is_reserved(&self, path: &RelPath) -> bool {
        self.reserved.iter().any(|r| {
            path == r
                || path
                    .as_str()
                    .strip_prefix(r.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn matches_ignore(rules: &Gitignore, path: &RelPath) -> bool {
    rules
        .matched_path_or_any_parents(Path::new(path.as_str()), false)
        .is_ignore()
}
