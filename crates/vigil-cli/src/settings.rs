//! Optional per-root settings file
//!
//! `<root>/.vigil/config.toml` supplies defaults for the non-path watch
//! options. Command-line flags always win over the file.
//!
//! ```toml
//! debounce-ms = 300
//! workers = 4
//! use-gitignore = true
//! ignore = ["*.log", "scratch/"]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use vigil_tracker::config::VIGIL_DIR;
use vigil_tracker::WatchConfig;

const SETTINGS_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Settings {
    pub debounce_ms: Option<u64>,
    pub workers: Option<usize>,
    pub use_gitignore: Option<bool>,
    pub ignore: Vec<String>,
}

impl Settings {
    /// Load `<root>/.vigil/config.toml`, or defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(VIGIL_DIR).join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Fold the file's values into a config built from defaults.
    pub fn apply(&self, config: &mut WatchConfig) {
        if let Some(ms) = self.debounce_ms {
            config.debounce = Duration::from_millis(ms);
        }
        if let Some(workers) = self.workers {
            config.workers = workers.max(1);
        }
        if let Some(use_gitignore) = self.use_gitignore {
            config.use_gitignore = use_gitignore;
        }
        config.extra_ignores.extend(self.ignore.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert!(settings.debounce_ms.is_none());
        assert!(settings.ignore.is_empty());
    }

    #[test]
    fn test_load_and_apply() {
        let tmp = TempDir::new().unwrap();
        let vigil = tmp.path().join(VIGIL_DIR);
        std::fs::create_dir_all(&vigil).unwrap();
        std::fs::write(
            vigil.join(SETTINGS_FILE),
            "debounce-ms = 300\nworkers = 2\nuse-gitignore = false\nignore = [\"*.log\"]\n",
        )
        .unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        let mut config = WatchConfig::new(tmp.path());
        settings.apply(&mut config);

        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.workers, 2);
        assert!(!config.use_gitignore);
        assert_eq!(config.extra_ignores, vec!["*.log".to_string()]);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let vigil = tmp.path().join(VIGIL_DIR);
        std::fs::create_dir_all(&vigil).unwrap();
        std::fs::write(vigil.join(SETTINGS_FILE), "debounce = 300\n").unwrap();

        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn test_partial_file_leaves_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let vigil = tmp.path().join(VIGIL_DIR);
        std::fs::create_dir_all(&vigil).unwrap();
        std::fs::write(vigil.join(SETTINGS_FILE), "workers = 3\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        let mut config = WatchConfig::new(tmp.path());
        let default_debounce = config.debounce;
        settings.apply(&mut config);

        assert_eq!(config.workers, 3);
        assert_eq!(config.debounce, default_debounce);
        assert!(config.use_gitignore);
    }
}
